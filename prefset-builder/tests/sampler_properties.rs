//! Negative sampler properties
//!
//! Exercises the sampler through the public API with pools of varying size
//! and overlap with the positive set.

use prefset_builder::sampler::{NegativeKind, NegativeSampler};
use prefset_common::{TrackKey, TrackRecord};
use std::collections::HashSet;

fn liked() -> Vec<TrackRecord> {
    vec![
        TrackRecord::new("p1", "Radiohead", "Karma Police"),
        TrackRecord::new("p2", "Radiohead", "No Surprises"),
        TrackRecord::new("p3", "Portishead", "Roads"),
        TrackRecord::new("p4", "Massive Attack", "Teardrop"),
        TrackRecord::new("p5", "Bjork", "Joga"),
    ]
}

/// Pool with `hard` same-artist tracks and `random` unrelated ones
fn pool(hard: usize, random: usize) -> Vec<TrackRecord> {
    let mut tracks = Vec::new();
    for i in 0..hard {
        tracks.push(TrackRecord::new(format!("h{}", i), "Radiohead", format!("Deep Cut {}", i)));
    }
    for i in 0..random {
        tracks.push(TrackRecord::new(format!("r{}", i), format!("Band {}", i), format!("Song {}", i)));
    }
    tracks
}

// =============================================================================
// Size
// =============================================================================

#[test]
fn sample_never_exceeds_ratio() {
    let sampler = NegativeSampler::new(3, 42);
    let sample = sampler.sample(&liked(), &pool(20, 500));
    assert_eq!(sample.requested, 15);
    assert!(sample.len() <= 15);
}

#[test]
fn small_pool_returns_every_eligible_candidate() {
    // Given: 10 eligible candidates for a request of 15
    let sampler = NegativeSampler::new(3, 42);
    let sample = sampler.sample(&liked(), &pool(4, 6));

    // Then: all 10 come back, no error
    assert_eq!(sample.len(), 10);
    assert!(sample.is_undersized());
    let ids: HashSet<&str> = sample.negatives.iter().map(|n| n.track.track_id.as_str()).collect();
    assert_eq!(ids.len(), 10);
}

#[test]
fn empty_pool_yields_empty_sample() {
    let sample = NegativeSampler::default().sample(&liked(), &[]);
    assert!(sample.is_empty());
    assert_eq!(sample.eligible, 0);
}

// =============================================================================
// Mix
// =============================================================================

#[test]
fn hard_negatives_capped_at_half() {
    let sample = NegativeSampler::new(3, 42).sample(&liked(), &pool(50, 50));
    assert_eq!(sample.hard_count(), 7);
    assert_eq!(sample.random_count(), 8);
}

#[test]
fn hard_negatives_share_a_positive_artist() {
    let positives = liked();
    let artists: HashSet<String> = positives.iter().map(TrackRecord::artist_key).collect();

    let sample = NegativeSampler::new(3, 7).sample(&positives, &pool(12, 40));
    for negative in sample.negatives.iter().filter(|n| n.kind == NegativeKind::Hard) {
        assert!(artists.contains(&negative.track.artist_key()));
    }
}

#[test]
fn hard_negatives_come_first() {
    let sample = NegativeSampler::default().sample(&liked(), &pool(10, 30));
    let first_random = sample
        .negatives
        .iter()
        .position(|n| n.kind == NegativeKind::Random)
        .unwrap_or(sample.len());
    assert!(sample.negatives[first_random..]
        .iter()
        .all(|n| n.kind == NegativeKind::Random));
}

// =============================================================================
// Exclusion
// =============================================================================

#[test]
fn positives_never_returned_as_negatives() {
    let positives = liked();
    let mut candidates = pool(5, 20);
    // Same songs under different ids and casing
    candidates.push(TrackRecord::new("dup1", "RADIOHEAD", "karma police"));
    candidates.push(TrackRecord::new("dup2", " Bjork ", "Joga "));

    let sample = NegativeSampler::new(10, 42).sample(&positives, &candidates);

    let positive_keys: HashSet<TrackKey> = positives.iter().map(TrackRecord::key).collect();
    assert!(sample
        .negatives
        .iter()
        .all(|n| !positive_keys.contains(&n.track.key())));
    assert_eq!(sample.eligible, 25);
}

#[test]
fn no_duplicate_negatives() {
    let mut candidates = pool(5, 20);
    candidates.extend(pool(5, 20));

    let sample = NegativeSampler::new(10, 1).sample(&liked(), &candidates);
    let keys: HashSet<TrackKey> = sample.negatives.iter().map(|n| n.track.key()).collect();
    assert_eq!(keys.len(), sample.len());
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn same_seed_same_sample() {
    let candidates = pool(30, 300);
    let a = NegativeSampler::new(3, 42).sample(&liked(), &candidates);
    let b = NegativeSampler::new(3, 42).sample(&liked(), &candidates);
    assert_eq!(a.negatives, b.negatives);
}

#[test]
fn different_seed_changes_sample() {
    let candidates = pool(30, 300);
    let a = NegativeSampler::new(3, 42).sample(&liked(), &candidates);
    let b = NegativeSampler::new(3, 43).sample(&liked(), &candidates);
    assert_ne!(a.negatives, b.negatives);
}
