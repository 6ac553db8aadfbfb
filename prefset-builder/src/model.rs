//! Per-user preference model artifacts
//!
//! Models are trained elsewhere and dropped into the models directory as
//! `user_<id>_model.json`. This module only loads and applies them.
//!
//! # Artifact Format
//! A linear scorer over the feature vector, with optional standardization:
//!
//! ```json
//! {
//!   "feature_dim": 393,
//!   "weights": [ ... 393 values ... ],
//!   "bias": -0.4,
//!   "mean": [ ... ],
//!   "scale": [ ... ]
//! }
//! ```
//!
//! `p = sigmoid(w · ((x - mean) / scale) + bias)`
//!
//! # Caching
//! [`ModelStore`] memoizes loaded models per user. A missing or corrupt
//! artifact means "no model available", never an error for the caller.

use prefset_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Probability used when no model is available
pub const DEFAULT_PROBABILITY: f64 = 0.5;

/// Linear preference scorer loaded from a JSON artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub feature_dim: usize,
    pub weights: Vec<f32>,
    #[serde(default)]
    pub bias: f32,
    #[serde(default)]
    pub mean: Option<Vec<f32>>,
    #[serde(default)]
    pub scale: Option<Vec<f32>>,
}

impl LinearModel {
    pub fn new(weights: Vec<f32>, bias: f32) -> Self {
        Self {
            feature_dim: weights.len(),
            weights,
            bias,
            mean: None,
            scale: None,
        }
    }

    /// Check internal consistency of the artifact
    pub fn validate(&self) -> Result<()> {
        if self.weights.len() != self.feature_dim {
            return Err(Error::Model(format!(
                "{} weights for feature_dim {}",
                self.weights.len(),
                self.feature_dim
            )));
        }
        for (name, values) in [("mean", &self.mean), ("scale", &self.scale)] {
            if let Some(values) = values {
                if values.len() != self.feature_dim {
                    return Err(Error::Model(format!(
                        "{} has {} values for feature_dim {}",
                        name,
                        values.len(),
                        self.feature_dim
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parse and validate an artifact from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let model: LinearModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Read and validate an artifact file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Write the artifact as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Probability that the user prefers the track behind `features`
    pub fn predict_proba(&self, features: &[f32]) -> Result<f64> {
        if features.len() != self.feature_dim {
            return Err(Error::Model(format!(
                "feature vector has {} values, model expects {}",
                features.len(),
                self.feature_dim
            )));
        }

        let mut logit = self.bias as f64;
        for (i, (&x, &w)) in features.iter().zip(&self.weights).enumerate() {
            let mut x = x as f64;
            if let Some(mean) = &self.mean {
                x -= mean[i] as f64;
            }
            if let Some(scale) = &self.scale {
                let s = scale[i] as f64;
                if s != 0.0 {
                    x /= s;
                }
            }
            logit += w as f64 * x;
        }

        Ok(sigmoid(logit))
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Loads and caches per-user models from a directory
///
/// Construct once and share by reference; `refresh` drops a cached entry so
/// the next lookup rereads the artifact.
#[derive(Debug)]
pub struct ModelStore {
    models_dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<LinearModel>>>,
}

impl ModelStore {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Artifact path for a user
    pub fn model_path(&self, user_id: &str) -> PathBuf {
        self.models_dir.join(format!("user_{}_model.json", user_id))
    }

    /// Get the user's model, loading it on first use
    ///
    /// Returns `None` when the artifact is missing or unreadable. Only
    /// successful loads are cached, so a model that appears later is found.
    pub fn get(&self, user_id: &str) -> Option<Arc<LinearModel>> {
        if let Some(model) = self.read_cache().get(user_id) {
            return Some(Arc::clone(model));
        }

        let path = self.model_path(user_id);
        if !path.exists() {
            info!(user_id, "No model artifact for user");
            return None;
        }

        match LinearModel::load(&path) {
            Ok(model) => {
                info!(
                    user_id,
                    feature_dim = model.feature_dim,
                    "Loaded model from {}",
                    path.display()
                );
                let model = Arc::new(model);
                self.write_cache()
                    .insert(user_id.to_string(), Arc::clone(&model));
                Some(model)
            }
            Err(e) => {
                warn!(user_id, "Model load failed for {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Drop the cached model for a user
    pub fn refresh(&self, user_id: &str) {
        if self.write_cache().remove(user_id).is_some() {
            debug!(user_id, "Evicted cached model");
        }
    }

    /// Store a model for a user, writing the artifact and caching it
    pub fn put(&self, user_id: &str, model: LinearModel) -> Result<Arc<LinearModel>> {
        model.validate()?;
        std::fs::create_dir_all(&self.models_dir)?;
        model.save(&self.model_path(user_id))?;
        let model = Arc::new(model);
        self.write_cache()
            .insert(user_id.to_string(), Arc::clone(&model));
        Ok(model)
    }

    pub fn cached_count(&self) -> usize {
        self.read_cache().len()
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<LinearModel>>> {
        self.cache.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_cache(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<LinearModel>>> {
        self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_zero_weights_give_half() {
        let model = LinearModel::new(vec![0.0; 4], 0.0);
        let p = model.predict_proba(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((p - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_positive_weight_raises_probability() {
        let model = LinearModel::new(vec![2.0, 0.0], 0.0);
        let high = model.predict_proba(&[1.0, 0.0]).unwrap();
        let low = model.predict_proba(&[-1.0, 0.0]).unwrap();
        assert!(high > 0.5);
        assert!(low < 0.5);
    }

    #[test]
    fn test_standardization_applied() {
        let mut model = LinearModel::new(vec![1.0], 0.0);
        model.mean = Some(vec![10.0]);
        model.scale = Some(vec![2.0]);
        // (10 - 10) / 2 = 0 -> 0.5
        assert!((model.predict_proba(&[10.0]).unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_dimension_mismatch() {
        let model = LinearModel::new(vec![1.0; 3], 0.0);
        assert!(matches!(
            model.predict_proba(&[1.0; 2]),
            Err(Error::Model(_))
        ));
    }

    #[test]
    fn test_invalid_artifact_rejected() {
        let json = r#"{"feature_dim": 3, "weights": [1.0, 2.0], "bias": 0.0}"#;
        assert!(matches!(LinearModel::from_json(json), Err(Error::Model(_))));
    }

    #[test]
    fn test_store_missing_model() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path());
        assert!(store.get("42").is_none());
        assert_eq!(store.cached_count(), 0);
    }

    #[test]
    fn test_store_corrupt_model_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path());
        std::fs::write(store.model_path("7"), "{not json").unwrap();
        assert!(store.get("7").is_none());
    }

    #[test]
    fn test_store_memoizes() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path());
        store.put("1", LinearModel::new(vec![0.5; 4], 0.1)).unwrap();
        store.refresh("1");

        let first = store.get("1").unwrap();
        // Remove the artifact; cached handle must still be served
        std::fs::remove_file(store.model_path("1")).unwrap();
        let second = store.get("1").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        store.refresh("1");
        assert!(store.get("1").is_none());
    }
}
