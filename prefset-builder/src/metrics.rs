//! Binary classification metrics for preference predictions
//!
//! Threshold metrics use a fixed decision threshold of 0.5. Undefined ratios
//! (no predicted positives, no actual positives) report 0.0.
//!
//! AUC is the Mann-Whitney rank statistic with tied scores sharing their
//! average rank. It is undefined, and reported as `None`, when either class
//! is absent.

use chrono::{DateTime, Utc};
use prefset_common::{Error, Result};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// Score at or above which a prediction counts as positive
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Summary of one evaluation run
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub auc: Option<f64>,
    pub positives: usize,
    pub negatives: usize,
}

impl MetricsSummary {
    /// Compute metrics from binary labels and predicted probabilities
    ///
    /// # Errors
    /// `Error::InvalidInput` when the lengths differ, the input is empty, or a
    /// label is not 0 or 1.
    pub fn compute(labels: &[u8], scores: &[f64]) -> Result<Self> {
        if labels.len() != scores.len() {
            return Err(Error::InvalidInput(format!(
                "{} labels but {} scores",
                labels.len(),
                scores.len()
            )));
        }
        if labels.is_empty() {
            return Err(Error::InvalidInput("no predictions to evaluate".to_string()));
        }
        if let Some(bad) = labels.iter().find(|&&label| label > 1) {
            return Err(Error::InvalidInput(format!("label {} is not binary", bad)));
        }

        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut tn = 0usize;
        let mut fn_ = 0usize;
        for (&label, &score) in labels.iter().zip(scores) {
            let predicted = score >= DECISION_THRESHOLD;
            match (label == 1, predicted) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (false, false) => tn += 1,
                (true, false) => fn_ += 1,
            }
        }

        let accuracy = ratio(tp + tn, labels.len());
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        let summary = Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            accuracy,
            precision,
            recall,
            f1,
            auc: roc_auc(labels, scores),
            positives: tp + fn_,
            negatives: tn + fp,
        };

        debug!(
            tp,
            fp,
            tn,
            fn_,
            accuracy = summary.accuracy,
            auc = ?summary.auc,
            "Computed metrics"
        );

        Ok(summary)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// ROC AUC by rank statistic; `None` unless both classes are present
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Option<f64> {
    let n_pos = labels.iter().filter(|&&l| l == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // 1-based ranks, ties share the average rank of their run
    let mut ranks = vec![0.0f64; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg_rank;
        }
        start = end;
    }

    let pos_rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|(&l, _)| l == 1)
        .map(|(_, &r)| r)
        .sum();

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}
