//! Configuration loading and config file resolution
//!
//! Config file resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`PREFSET_CONFIG`)
//! 3. Per-user config file (`<config_dir>/prefset/config.toml`)
//! 4. Built-in defaults (no file)
//!
//! Every setting has a built-in default, so a partial TOML file is valid.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "PREFSET_CONFIG";

/// Largest accepted `sampling.ratio`
pub const MAX_SAMPLING_RATIO: usize = 1000;

/// Top-level configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Directory holding per-user model artifacts
    ///
    /// If not specified, falls back to the OS-dependent data directory
    #[serde(default)]
    pub models_dir: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub sampling: SamplingConfig,

    #[serde(default)]
    pub features: FeatureConfig,

    #[serde(default)]
    pub training: TrainingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Negative sampling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Negatives requested per positive
    #[serde(default = "default_ratio")]
    pub ratio: usize,

    /// RNG seed for sampling and shuffling
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            ratio: default_ratio(),
            seed: default_seed(),
        }
    }
}

/// Text encoder selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    /// Built-in feature-hashing encoder
    Hashing,
    /// No text encoder; feature building falls back to audio-only vectors
    None,
}

/// Feature vector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Text embedding block width
    #[serde(default = "default_text_dim")]
    pub text_dim: usize,

    #[serde(default = "default_encoder")]
    pub encoder: EncoderKind,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            text_dim: default_text_dim(),
            encoder: default_encoder(),
        }
    }
}

/// Training set assembly configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Minimum positives required before a training set is built
    #[serde(default = "default_min_positives")]
    pub min_positives: usize,

    /// Share of examples held out for evaluation
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_positives: default_min_positives(),
            test_fraction: default_test_fraction(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ratio() -> usize {
    3
}

fn default_seed() -> u64 {
    42
}

fn default_text_dim() -> usize {
    384
}

fn default_encoder() -> EncoderKind {
    EncoderKind::Hashing
}

fn default_min_positives() -> usize {
    5
}

fn default_test_fraction() -> f64 {
    0.15
}

impl TomlConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Read config {} failed: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config file and load it, falling back to built-in defaults
    ///
    /// An explicitly named file (CLI or environment) must exist; the per-user
    /// file is optional.
    pub fn load(cli_arg: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_arg) {
            Some(ConfigSource::Explicit(path)) => {
                info!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            Some(ConfigSource::UserDefault(path)) => {
                info!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            None => {
                debug!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject settings the sampler and feature builder cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.sampling.ratio == 0 || self.sampling.ratio > MAX_SAMPLING_RATIO {
            return Err(Error::Configuration(format!(
                "sampling.ratio must be between 1 and {}, got {}",
                MAX_SAMPLING_RATIO, self.sampling.ratio
            )));
        }
        if self.features.text_dim == 0 {
            return Err(Error::Configuration(
                "features.text_dim must be at least 1".to_string(),
            ));
        }
        let fraction = self.training.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(Error::Configuration(format!(
                "training.test_fraction must be in (0, 1), got {}",
                fraction
            )));
        }
        Ok(())
    }

    /// Directory for per-user model artifacts
    pub fn models_dir(&self) -> PathBuf {
        self.models_dir
            .clone()
            .unwrap_or_else(default_models_dir)
    }
}

/// Where the config file came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named on the command line or in the environment
    Explicit(PathBuf),
    /// Found at the per-user config location
    UserDefault(PathBuf),
}

/// Resolve the config file following the priority order in the module docs
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<ConfigSource> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(ConfigSource::Explicit(path.to_path_buf()));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(ConfigSource::Explicit(PathBuf::from(path)));
        }
    }

    // Priority 3: Per-user config file
    let user_config = dirs::config_dir().map(|d| d.join("prefset").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(ConfigSource::UserDefault(path));
        }
    }

    // Priority 4: Built-in defaults
    None
}

/// Get OS-dependent default models directory
fn default_models_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("prefset").join("models"))
        .unwrap_or_else(|| PathBuf::from("./prefset_data/models"))
}
