//! prefset-builder library interface
//!
//! Builds per-user preference training data:
//! - Negative sampling (hard + random) from a candidate pool
//! - Fused text + audio feature vectors, with an audio-only fallback
//! - Rule-based audio descriptor estimation from track metadata
//! - Model loading, candidate ranking and offline metrics

pub mod dataset;
pub mod encoder;
pub mod estimator;
pub mod export;
pub mod features;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod ranking;
pub mod sampler;

pub use dataset::{DatasetBuilder, LabeledExample, TrainingSet};
pub use encoder::{encoder_from_config, HashingEncoder, TextEncoder};
pub use estimator::{AudioEstimator, AudioPredictor, RuleBasedEstimator};
pub use export::{DatasetExport, ExampleExport, Split};
pub use features::{FeatureMatrix, FeaturePipeline, FeatureVectorBuilder};
pub use loader::LabeledTracks;
pub use metrics::MetricsSummary;
pub use model::{LinearModel, ModelStore};
pub use ranking::{RankedTrack, Recommender};
pub use sampler::{Negative, NegativeKind, NegativeSample, NegativeSampler};
