//! Audio Descriptor Estimator
//!
//! Estimates the 9 audio descriptors for tracks that have no measured values.
//!
//! # Strategies
//! - **Learned**: an injected [`AudioPredictor`] (e.g. a regressor trained on
//!   catalog text)
//! - **RuleBased**: keyword-category heuristics over the track's text plus a
//!   duration nudge; deterministic and explainable, used for cold start
//!
//! The strategy is chosen once, by availability of a predictor, through
//! [`AudioEstimator::select`].
//!
//! # Keyword Categories
//! The first category whose keyword occurs in the lowercased text wins:
//! - electronic (edm, electronic, dance, club): danceable, energetic, not acoustic
//! - mellow (ballad, slow, acoustic, folk): calm, acoustic
//! - heavy (rock, metal, punk): energetic, loud
//! - hiphop (hip hop, rap, hiphop): speechy, danceable
//! - classical (classical, orchestra, piano): instrumental, acoustic, calm
//! - jazz (jazz, blues): somewhat acoustic and instrumental
//!
//! Short tracks (< 3 min) get +0.1 energy; long tracks (> 6 min) get +0.2
//! instrumentalness. All values are clamped to [0, 1] except tempo (BPM) and
//! loudness (dB).

use crate::features::track_text;
use prefset_common::{AudioDescriptors, Result, TrackRecord};
use std::sync::Arc;
use tracing::debug;

/// Duration assumed when a track has none
pub const DEFAULT_DURATION_MS: u64 = 200_000;

const SHORT_TRACK_MS: u64 = 180_000;
const LONG_TRACK_MS: u64 = 360_000;

/// Baseline descriptors before keyword adjustments
const BASELINE: AudioDescriptors = AudioDescriptors {
    danceability: 0.5,
    energy: 0.5,
    speechiness: 0.1,
    acousticness: 0.3,
    instrumentalness: 0.1,
    liveness: 0.2,
    valence: 0.5,
    tempo: 120.0,
    loudness: -6.0,
};

/// Keyword category with the descriptors it overrides
struct KeywordCategory {
    name: &'static str,
    keywords: &'static [&'static str],
    danceability: Option<f32>,
    energy: Option<f32>,
    speechiness: Option<f32>,
    acousticness: Option<f32>,
    instrumentalness: Option<f32>,
    loudness: Option<f32>,
}

const NO_OVERRIDES: KeywordCategory = KeywordCategory {
    name: "",
    keywords: &[],
    danceability: None,
    energy: None,
    speechiness: None,
    acousticness: None,
    instrumentalness: None,
    loudness: None,
};

/// Categories in match-priority order
const CATEGORIES: [KeywordCategory; 6] = [
    KeywordCategory {
        name: "electronic",
        keywords: &["edm", "electronic", "dance", "club"],
        danceability: Some(0.8),
        energy: Some(0.85),
        acousticness: Some(0.1),
        ..NO_OVERRIDES
    },
    KeywordCategory {
        name: "mellow",
        keywords: &["ballad", "slow", "acoustic", "folk"],
        danceability: Some(0.3),
        energy: Some(0.3),
        acousticness: Some(0.8),
        ..NO_OVERRIDES
    },
    KeywordCategory {
        name: "heavy",
        keywords: &["rock", "metal", "punk"],
        energy: Some(0.9),
        loudness: Some(-4.0),
        ..NO_OVERRIDES
    },
    KeywordCategory {
        name: "hiphop",
        keywords: &["hip hop", "rap", "hiphop"],
        speechiness: Some(0.3),
        danceability: Some(0.7),
        ..NO_OVERRIDES
    },
    KeywordCategory {
        name: "classical",
        keywords: &["classical", "orchestra", "piano"],
        instrumentalness: Some(0.8),
        acousticness: Some(0.9),
        energy: Some(0.3),
        ..NO_OVERRIDES
    },
    KeywordCategory {
        name: "jazz",
        keywords: &["jazz", "blues"],
        acousticness: Some(0.6),
        instrumentalness: Some(0.4),
        ..NO_OVERRIDES
    },
];

impl KeywordCategory {
    fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|keyword| text.contains(keyword))
    }

    fn apply(&self, d: &mut AudioDescriptors) {
        let overrides = [
            (&mut d.danceability, self.danceability),
            (&mut d.energy, self.energy),
            (&mut d.speechiness, self.speechiness),
            (&mut d.acousticness, self.acousticness),
            (&mut d.instrumentalness, self.instrumentalness),
            (&mut d.loudness, self.loudness),
        ];
        for (slot, value) in overrides {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

/// Keyword and duration heuristic estimator
///
/// Pure function of (artist, title, album, tags, duration).
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedEstimator;

impl RuleBasedEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Estimate descriptors for a track record
    pub fn estimate(&self, track: &TrackRecord) -> AudioDescriptors {
        self.estimate_text(&track_text(track), track.duration_ms)
    }

    /// Estimate descriptors from already-joined track text
    ///
    /// # Arguments
    /// * `text` - Artist, title, album and tags joined by spaces
    /// * `duration_ms` - Track length; `None` uses [`DEFAULT_DURATION_MS`]
    pub fn estimate_text(&self, text: &str, duration_ms: Option<u64>) -> AudioDescriptors {
        let text = text.to_lowercase();
        let mut d = BASELINE;

        match CATEGORIES.iter().find(|category| category.matches(&text)) {
            Some(category) => {
                debug!(category = category.name, "Matched keyword category");
                category.apply(&mut d);
            }
            None => debug!("No keyword category matched, using baseline"),
        }

        let duration_ms = duration_ms.unwrap_or(DEFAULT_DURATION_MS);
        if duration_ms < SHORT_TRACK_MS {
            d.energy += 0.1;
        } else if duration_ms > LONG_TRACK_MS {
            d.instrumentalness += 0.2;
        }

        clamp_unit_descriptors(d)
    }
}

/// Clamp every descriptor except tempo and loudness to [0, 1]
fn clamp_unit_descriptors(d: AudioDescriptors) -> AudioDescriptors {
    let mut values = d.to_array();
    for value in values.iter_mut().take(7) {
        *value = value.clamp(0.0, 1.0);
    }
    AudioDescriptors::from_array(values)
}

/// Trained audio-descriptor predictor
pub trait AudioPredictor: Send + Sync {
    /// Predictor name for logging
    fn name(&self) -> &'static str;

    /// Predict descriptors for a track
    fn predict(&self, track: &TrackRecord) -> Result<AudioDescriptors>;
}

/// Audio estimation strategy, selected by predictor availability
#[derive(Clone)]
pub enum AudioEstimator {
    Learned(Arc<dyn AudioPredictor>),
    RuleBased(RuleBasedEstimator),
}

impl AudioEstimator {
    /// Use the predictor if one is available, otherwise the rule-based heuristics
    pub fn select(predictor: Option<Arc<dyn AudioPredictor>>) -> Self {
        match predictor {
            Some(predictor) => {
                debug!(predictor = predictor.name(), "Using learned audio predictor");
                AudioEstimator::Learned(predictor)
            }
            None => {
                debug!("No audio predictor available, using rule-based estimates");
                AudioEstimator::RuleBased(RuleBasedEstimator::new())
            }
        }
    }

    pub fn is_rule_based(&self) -> bool {
        matches!(self, AudioEstimator::RuleBased(_))
    }

    /// Estimate descriptors; only the learned strategy can fail
    pub fn estimate(&self, track: &TrackRecord) -> Result<AudioDescriptors> {
        match self {
            AudioEstimator::Learned(predictor) => predictor.predict(track),
            AudioEstimator::RuleBased(rules) => Ok(rules.estimate(track)),
        }
    }
}

impl std::fmt::Debug for AudioEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioEstimator::Learned(predictor) => {
                f.debug_tuple("Learned").field(&predictor.name()).finish()
            }
            AudioEstimator::RuleBased(_) => f.write_str("RuleBased"),
        }
    }
}
