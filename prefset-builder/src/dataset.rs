//! Training set assembly
//!
//! Combines a user's positives with sampled negatives into a labeled,
//! shuffled training set, and optionally holds out a stratified test split.

use crate::features::{FeatureMatrix, FeaturePipeline};
use crate::sampler::{NegativeKind, NegativeSample, NegativeSampler};
use prefset_common::config::TomlConfig;
use prefset_common::{Error, Result, TrackRecord};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

/// Fewest positives a training set is built from when not configured
pub const DEFAULT_MIN_POSITIVES: usize = 5;

/// A track with its preference label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledExample {
    pub track: TrackRecord,
    /// 1 = preferred, 0 = negative
    pub label: u8,
    /// How the negative was drawn; `None` for positives
    pub provenance: Option<NegativeKind>,
}

impl LabeledExample {
    pub fn positive(track: TrackRecord) -> Self {
        Self {
            track,
            label: 1,
            provenance: None,
        }
    }

    pub fn negative(track: TrackRecord, kind: NegativeKind) -> Self {
        Self {
            track,
            label: 0,
            provenance: Some(kind),
        }
    }

    pub fn is_positive(&self) -> bool {
        self.label == 1
    }
}

/// Labeled examples for one training run
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub examples: Vec<LabeledExample>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn positive_count(&self) -> usize {
        self.examples.iter().filter(|e| e.is_positive()).count()
    }

    pub fn negative_count(&self) -> usize {
        self.len() - self.positive_count()
    }

    pub fn count_provenance(&self, kind: NegativeKind) -> usize {
        self.examples
            .iter()
            .filter(|e| e.provenance == Some(kind))
            .count()
    }

    pub fn labels(&self) -> Vec<u8> {
        self.examples.iter().map(|e| e.label).collect()
    }

    pub fn tracks(&self) -> Vec<&TrackRecord> {
        self.examples.iter().map(|e| &e.track).collect()
    }

    /// Vectorize every example through `pipeline`, rows in example order
    pub fn features(&self, pipeline: &FeaturePipeline) -> Result<FeatureMatrix> {
        pipeline.vectorize_all(&self.tracks())
    }

    /// Split into (train, test) keeping the class ratio in both parts
    ///
    /// Each class contributes `round(count * test_fraction)` examples to the
    /// test part, at least one when the class has two or more examples.
    pub fn stratified_split(&self, test_fraction: f64, seed: u64) -> Result<(TrainingSet, TrainingSet)> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(Error::InvalidInput(format!(
                "test fraction must be in (0, 1), got {}",
                test_fraction
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut train = Vec::new();
        let mut test = Vec::new();

        for label in [1u8, 0u8] {
            let mut class: Vec<LabeledExample> = self
                .examples
                .iter()
                .filter(|e| e.label == label)
                .cloned()
                .collect();
            class.shuffle(&mut rng);

            let mut n_test = (class.len() as f64 * test_fraction).round() as usize;
            if n_test == 0 && class.len() >= 2 {
                n_test = 1;
            }
            let n_test = n_test.min(class.len());

            let rest = class.split_off(n_test);
            test.extend(class);
            train.extend(rest);
        }

        train.shuffle(&mut rng);
        test.shuffle(&mut rng);

        Ok((TrainingSet { examples: train }, TrainingSet { examples: test }))
    }
}

/// Builds labeled training sets from positives and a candidate pool
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    sampler: NegativeSampler,
    min_positives: usize,
}

impl DatasetBuilder {
    pub fn new(sampler: NegativeSampler, min_positives: usize) -> Self {
        Self {
            sampler,
            min_positives,
        }
    }

    pub fn from_config(config: &TomlConfig) -> Self {
        Self::new(
            NegativeSampler::from_config(&config.sampling),
            config.training.min_positives,
        )
    }

    pub fn sampler(&self) -> &NegativeSampler {
        &self.sampler
    }

    /// Label positives and sampled negatives, then shuffle with the sampler seed
    ///
    /// # Errors
    /// `Error::InsufficientData` when fewer than `min_positives` distinct
    /// positives (by normalized key) are given; nothing is sampled in that case.
    pub fn build(&self, positives: &[TrackRecord], pool: &[TrackRecord]) -> Result<TrainingSet> {
        let distinct = positives
            .iter()
            .map(TrackRecord::key)
            .collect::<HashSet<_>>()
            .len();
        if distinct < self.min_positives {
            warn!(
                found = distinct,
                rows = positives.len(),
                required = self.min_positives,
                "Not enough positive examples to build a training set"
            );
            return Err(Error::InsufficientData {
                found: distinct,
                required: self.min_positives,
            });
        }

        let sample = self.sampler.sample(positives, pool);
        let set = self.assemble(positives, sample);

        info!(
            positives = set.positive_count(),
            negatives = set.negative_count(),
            hard = set.count_provenance(NegativeKind::Hard),
            random = set.count_provenance(NegativeKind::Random),
            "Training set assembled"
        );

        Ok(set)
    }

    fn assemble(&self, positives: &[TrackRecord], sample: NegativeSample) -> TrainingSet {
        let mut examples: Vec<LabeledExample> = positives
            .iter()
            .cloned()
            .map(LabeledExample::positive)
            .chain(
                sample
                    .negatives
                    .into_iter()
                    .map(|n| LabeledExample::negative(n.track, n.kind)),
            )
            .collect();

        let mut rng = StdRng::seed_from_u64(self.sampler.seed());
        examples.shuffle(&mut rng);

        TrainingSet { examples }
    }
}

impl Default for DatasetBuilder {
    fn default() -> Self {
        Self::new(NegativeSampler::default(), DEFAULT_MIN_POSITIVES)
    }
}
