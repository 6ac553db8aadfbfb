//! Dataset export document
//!
//! The JSON written by `prefset build`: run metadata, class and provenance
//! counts, then every example tagged with its split. Train examples come
//! first, test examples second. Feature vectors are included only when a
//! pipeline is given.

use crate::dataset::{LabeledExample, TrainingSet};
use crate::features::FeaturePipeline;
use crate::sampler::{NegativeKind, NegativeSampler};
use chrono::{DateTime, Utc};
use prefset_common::Result;
use serde::Serialize;
use uuid::Uuid;

/// Which part of a split an example belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetExport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub seed: u64,
    pub ratio: usize,
    pub positives: usize,
    pub negatives: usize,
    pub hard_negatives: usize,
    pub random_negatives: usize,
    /// `None` when features were skipped
    pub feature_dim: Option<usize>,
    pub examples: Vec<ExampleExport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExampleExport {
    pub track_id: String,
    pub artist: String,
    pub title: String,
    pub label: u8,
    pub provenance: Option<NegativeKind>,
    pub split: Split,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<f32>>,
}

impl DatasetExport {
    /// Assemble the export for a train/test split of one training set
    ///
    /// # Errors
    /// Propagates feature pipeline failures.
    pub fn assemble(
        train: &TrainingSet,
        test: &TrainingSet,
        sampler: &NegativeSampler,
        pipeline: Option<&FeaturePipeline>,
    ) -> Result<Self> {
        let mut examples = Vec::with_capacity(train.len() + test.len());
        append_examples(&mut examples, train, Split::Train, pipeline)?;
        append_examples(&mut examples, test, Split::Test, pipeline)?;

        let count_kind = |kind| train.count_provenance(kind) + test.count_provenance(kind);

        Ok(Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            seed: sampler.seed(),
            ratio: sampler.ratio(),
            positives: train.positive_count() + test.positive_count(),
            negatives: train.negative_count() + test.negative_count(),
            hard_negatives: count_kind(NegativeKind::Hard),
            random_negatives: count_kind(NegativeKind::Random),
            feature_dim: pipeline.map(FeaturePipeline::dim),
            examples,
        })
    }

    pub fn split_count(&self, split: Split) -> usize {
        self.examples.iter().filter(|e| e.split == split).count()
    }
}

fn append_examples(
    out: &mut Vec<ExampleExport>,
    set: &TrainingSet,
    split: Split,
    pipeline: Option<&FeaturePipeline>,
) -> Result<()> {
    let mut rows = match pipeline {
        Some(pipeline) => Some(set.features(pipeline)?.into_rows().into_iter()),
        None => None,
    };

    for LabeledExample {
        track,
        label,
        provenance,
    } in &set.examples
    {
        out.push(ExampleExport {
            track_id: track.track_id.clone(),
            artist: track.artist.clone(),
            title: track.title.clone(),
            label: *label,
            provenance: *provenance,
            split,
            features: rows.as_mut().and_then(|rows| rows.next()),
        });
    }
    Ok(())
}
