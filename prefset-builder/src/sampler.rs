//! Negative Sampler
//!
//! Draws negative examples for a user's positive set from a large candidate
//! pool using a mixed policy:
//! - **Hard negatives**: other tracks by artists the user already likes
//! - **Random negatives**: anything else in the pool
//!
//! # Sampling Policy
//! Given `n` positives and a ratio `r`, `n * r` negatives are requested.
//! 1. Drop pool candidates whose normalized (artist, title) key matches a
//!    positive, and collapse duplicate keys within the pool (first wins)
//! 2. Hard pool = remaining candidates whose artist matches a positive artist
//! 3. Draw `min(|hard pool|, n * r / 2)` hard negatives without replacement
//! 4. Fill the rest from every remaining candidate not already drawn
//!
//! A pool that is too small yields an undersized sample, never an error.
//! Draws come from a seeded RNG so repeated runs produce the same sample.

use prefset_common::config::SamplingConfig;
use prefset_common::{TrackKey, TrackRecord};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

/// Negatives requested per positive when not configured
pub const DEFAULT_RATIO: usize = 3;

/// Sampling seed when not configured
pub const DEFAULT_SEED: u64 = 42;

/// How a negative example was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeKind {
    /// Same artist as a positive, different track
    Hard,
    /// Unrelated candidate
    Random,
}

impl fmt::Display for NegativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegativeKind::Hard => write!(f, "hard"),
            NegativeKind::Random => write!(f, "random"),
        }
    }
}

/// A sampled negative with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct Negative {
    pub track: TrackRecord,
    pub kind: NegativeKind,
}

/// Result of one sampling pass
#[derive(Debug, Clone, Default)]
pub struct NegativeSample {
    /// Hard negatives first, then random negatives
    pub negatives: Vec<Negative>,
    /// Negatives requested (`positives * ratio`)
    pub requested: usize,
    /// Unique pool candidates left after dropping positives
    pub eligible: usize,
}

impl NegativeSample {
    pub fn len(&self) -> usize {
        self.negatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.negatives.is_empty()
    }

    pub fn hard_count(&self) -> usize {
        self.count_kind(NegativeKind::Hard)
    }

    pub fn random_count(&self) -> usize {
        self.count_kind(NegativeKind::Random)
    }

    /// True when the pool could not supply every requested negative
    pub fn is_undersized(&self) -> bool {
        self.negatives.len() < self.requested
    }

    fn count_kind(&self, kind: NegativeKind) -> usize {
        self.negatives.iter().filter(|n| n.kind == kind).count()
    }
}

/// Seeded hard/random negative sampler
#[derive(Debug, Clone)]
pub struct NegativeSampler {
    ratio: usize,
    seed: u64,
}

impl NegativeSampler {
    pub fn new(ratio: usize, seed: u64) -> Self {
        Self { ratio, seed }
    }

    pub fn from_config(config: &SamplingConfig) -> Self {
        Self::new(config.ratio, config.seed)
    }

    pub fn ratio(&self) -> usize {
        self.ratio
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draw up to `positives.len() * ratio` negatives from `pool`
    ///
    /// # Arguments
    /// * `positives` - Tracks the user likes
    /// * `pool` - Candidate tracks; may contain positives and duplicates
    ///
    /// # Returns
    /// Negatives tagged hard or random. No returned negative shares a
    /// normalized key with any positive.
    pub fn sample(&self, positives: &[TrackRecord], pool: &[TrackRecord]) -> NegativeSample {
        let requested = positives.len().saturating_mul(self.ratio);

        let positive_keys: HashSet<TrackKey> = positives.iter().map(TrackRecord::key).collect();
        let positive_artists: HashSet<String> = positives
            .iter()
            .map(TrackRecord::artist_key)
            .filter(|artist| !artist.is_empty())
            .collect();

        let eligible = eligible_candidates(pool, &positive_keys);
        debug!(
            pool_size = pool.len(),
            eligible = eligible.len(),
            "Deduplicated candidate pool against positives"
        );

        let hard_pool: Vec<usize> = eligible
            .iter()
            .enumerate()
            .filter(|(_, track)| positive_artists.contains(&track.artist_key()))
            .map(|(i, _)| i)
            .collect();

        let mut rng = StdRng::seed_from_u64(self.seed);

        // Hard negatives: at most half of the request
        let hard_target = hard_pool.len().min(requested / 2);
        let hard_picks: Vec<usize> = index::sample(&mut rng, hard_pool.len(), hard_target)
            .into_iter()
            .map(|i| hard_pool[i])
            .collect();
        let taken: HashSet<usize> = hard_picks.iter().copied().collect();

        // Random negatives: everything not yet drawn, hard pool leftovers included
        let remaining: Vec<usize> = (0..eligible.len()).filter(|i| !taken.contains(i)).collect();
        let random_target = requested - hard_picks.len();
        let random_picks: Vec<usize> = if remaining.len() <= random_target {
            remaining
        } else {
            index::sample(&mut rng, remaining.len(), random_target)
                .into_iter()
                .map(|i| remaining[i])
                .collect()
        };

        let mut negatives = Vec::with_capacity(hard_picks.len() + random_picks.len());
        negatives.extend(hard_picks.into_iter().map(|i| Negative {
            track: eligible[i].clone(),
            kind: NegativeKind::Hard,
        }));
        negatives.extend(random_picks.into_iter().map(|i| Negative {
            track: eligible[i].clone(),
            kind: NegativeKind::Random,
        }));

        let sample = NegativeSample {
            negatives,
            requested,
            eligible: eligible.len(),
        };

        info!(
            ratio = self.ratio,
            requested = sample.requested,
            hard = sample.hard_count(),
            random = sample.random_count(),
            total = sample.len(),
            "Negative sampling complete"
        );
        if sample.is_undersized() {
            info!(
                requested = sample.requested,
                available = sample.len(),
                "Candidate pool smaller than requested, returning all eligible candidates"
            );
        }

        sample
    }
}

impl Default for NegativeSampler {
    fn default() -> Self {
        Self::new(DEFAULT_RATIO, DEFAULT_SEED)
    }
}

/// Pool candidates that are not positives, one per normalized key
fn eligible_candidates<'a>(
    pool: &'a [TrackRecord],
    positive_keys: &HashSet<TrackKey>,
) -> Vec<&'a TrackRecord> {
    let mut seen = HashSet::new();
    pool.iter()
        .filter(|track| {
            let key = track.key();
            !positive_keys.contains(&key) && seen.insert(key)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, artist: &str, title: &str) -> TrackRecord {
        TrackRecord::new(id, artist, title)
    }

    fn positives() -> Vec<TrackRecord> {
        vec![
            track("p1", "Radiohead", "Creep"),
            track("p2", "Radiohead", "Karma Police"),
        ]
    }

    #[test]
    fn test_default_sampler() {
        let sampler = NegativeSampler::default();
        assert_eq!(sampler.ratio(), 3);
        assert_eq!(sampler.seed(), 42);
    }

    #[test]
    fn test_positive_keys_never_sampled() {
        let pool = vec![
            track("c1", "RADIOHEAD", " creep "),
            track("c2", "Radiohead", "No Surprises"),
            track("c3", "Muse", "Uprising"),
        ];
        let sample = NegativeSampler::new(3, 42).sample(&positives(), &pool);

        assert_eq!(sample.eligible, 2);
        assert_eq!(sample.len(), 2);
        assert!(sample.negatives.iter().all(|n| n.track.track_id != "c1"));
    }

    #[test]
    fn test_huge_ratio_saturates() {
        let sample = NegativeSampler::new(usize::MAX, 42).sample(&positives(), &[]);
        assert_eq!(sample.requested, usize::MAX);
        assert!(sample.is_empty());

        let pool = vec![track("c1", "Radiohead", "Nude"), track("c2", "Other", "Song")];
        let sample = NegativeSampler::new(usize::MAX, 42).sample(&positives(), &pool);
        assert_eq!(sample.len(), 2);
        assert_eq!(sample.hard_count(), 1);
    }

    #[test]
    fn test_duplicate_pool_keys_collapse() {
        let pool = vec![
            track("c1", "Muse", "Uprising"),
            track("c2", "muse", "UPRISING"),
            track("c3", "Muse", "Hysteria"),
        ];
        let sample = NegativeSampler::new(3, 42).sample(&positives(), &pool);
        assert_eq!(sample.eligible, 2);
        assert_eq!(sample.len(), 2);
    }

    #[test]
    fn test_hard_negatives_capped_at_half() {
        let mut pool: Vec<TrackRecord> = (0..20)
            .map(|i| track(&format!("h{}", i), "Radiohead", &format!("B-side {}", i)))
            .collect();
        pool.extend((0..20).map(|i| track(&format!("r{}", i), "Other", &format!("Song {}", i))));

        // 2 positives * 3 = 6 requested, at most 3 hard
        let sample = NegativeSampler::new(3, 42).sample(&positives(), &pool);
        assert_eq!(sample.requested, 6);
        assert_eq!(sample.len(), 6);
        assert_eq!(sample.hard_count(), 3);
        assert_eq!(sample.random_count(), 3);
        for negative in &sample.negatives {
            if negative.kind == NegativeKind::Hard {
                assert_eq!(negative.track.artist, "Radiohead");
            }
        }
    }

    #[test]
    fn test_no_hard_pool_all_random() {
        let pool: Vec<TrackRecord> = (0..10)
            .map(|i| track(&format!("r{}", i), "Other", &format!("Song {}", i)))
            .collect();
        let sample = NegativeSampler::new(3, 42).sample(&positives(), &pool);
        assert_eq!(sample.hard_count(), 0);
        assert_eq!(sample.random_count(), 6);
    }

    #[test]
    fn test_small_hard_pool_filled_by_random() {
        let mut pool = vec![track("h1", "Radiohead", "Airbag")];
        pool.extend((0..10).map(|i| track(&format!("r{}", i), "Other", &format!("Song {}", i))));
        let sample = NegativeSampler::new(3, 42).sample(&positives(), &pool);
        assert_eq!(sample.hard_count(), 1);
        assert_eq!(sample.random_count(), 5);
    }

    #[test]
    fn test_same_seed_same_sample() {
        let pool: Vec<TrackRecord> = (0..50)
            .map(|i| track(&format!("r{}", i), &format!("Artist {}", i % 7), &format!("Song {}", i)))
            .collect();
        let a = NegativeSampler::new(3, 7).sample(&positives(), &pool);
        let b = NegativeSampler::new(3, 7).sample(&positives(), &pool);
        assert_eq!(a.negatives, b.negatives);
    }

    #[test]
    fn test_empty_positives_request_nothing() {
        let pool = vec![track("c1", "Muse", "Uprising")];
        let sample = NegativeSampler::new(3, 42).sample(&[], &pool);
        assert_eq!(sample.requested, 0);
        assert!(sample.is_empty());
        assert!(!sample.is_undersized());
    }

    #[test]
    fn test_negative_kind_serialization() {
        assert_eq!(serde_json::to_string(&NegativeKind::Hard).unwrap(), "\"hard\"");
        assert_eq!(NegativeKind::Random.to_string(), "random");
    }
}
