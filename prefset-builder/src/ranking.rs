//! Candidate ranking against a user's preference model

use crate::features::FeaturePipeline;
use crate::model::{ModelStore, DEFAULT_PROBABILITY};
use prefset_common::{Result, TrackRecord};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{info, warn};

/// Default number of recommendations returned
pub const DEFAULT_TOP_K: usize = 10;

/// Default minimum probability for a recommendation
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// A scored candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTrack {
    pub track_id: String,
    pub artist: String,
    pub title: String,
    pub score: f64,
}

/// Scores candidate tracks with per-user models
///
/// Users without a usable model get [`DEFAULT_PROBABILITY`] for every
/// candidate, so they only see results when the threshold allows it.
pub struct Recommender<'a> {
    pipeline: &'a FeaturePipeline,
    store: &'a ModelStore,
}

impl<'a> Recommender<'a> {
    pub fn new(pipeline: &'a FeaturePipeline, store: &'a ModelStore) -> Self {
        Self { pipeline, store }
    }

    /// Probability per candidate, same order as input
    pub fn score(&self, user_id: &str, candidates: &[TrackRecord]) -> Result<Vec<f64>> {
        let model = match self.store.get(user_id) {
            Some(model) if model.feature_dim == self.pipeline.dim() => model,
            Some(model) => {
                warn!(
                    user_id,
                    model_dim = model.feature_dim,
                    pipeline_dim = self.pipeline.dim(),
                    "Model does not match feature layout, using default probability"
                );
                return Ok(vec![DEFAULT_PROBABILITY; candidates.len()]);
            }
            None => return Ok(vec![DEFAULT_PROBABILITY; candidates.len()]),
        };

        let refs: Vec<&TrackRecord> = candidates.iter().collect();
        let matrix = self.pipeline.vectorize_all(&refs)?;
        matrix
            .rows()
            .iter()
            .map(|row| model.predict_proba(row))
            .collect()
    }

    /// Top `top_k` candidates scoring at least `threshold`, best first
    ///
    /// Equal scores keep candidate order.
    pub fn recommend(
        &self,
        user_id: &str,
        candidates: &[TrackRecord],
        top_k: usize,
        threshold: f64,
    ) -> Result<Vec<RankedTrack>> {
        let scores = self.score(user_id, candidates)?;

        let mut ranked: Vec<RankedTrack> = candidates
            .iter()
            .zip(scores)
            .filter(|(_, score)| *score >= threshold)
            .map(|(track, score)| RankedTrack {
                track_id: track.track_id.clone(),
                artist: track.artist.clone(),
                title: track.title.clone(),
                score,
            })
            .collect();

        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        ranked.truncate(top_k);

        info!(
            user_id,
            candidates = candidates.len(),
            returned = ranked.len(),
            threshold,
            "Ranked candidates"
        );

        Ok(ranked)
    }
}
