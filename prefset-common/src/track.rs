//! Track data model
//!
//! Track records are read-only snapshots of rows from an external catalog
//! (CSV export or query result). Audio descriptors are optional per record;
//! consumers decide how to impute the missing ones.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Audio descriptor names in feature-vector order
pub const AUDIO_FEATURE_NAMES: [&str; 9] = [
    "danceability",
    "energy",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "tempo",
    "loudness",
];

/// A single track from the positive set or the candidate pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// External track identifier
    pub track_id: String,
    pub artist: String,
    pub title: String,
    #[serde(default)]
    pub album: String,
    /// Free-text tags, usually `|` or `,` separated
    #[serde(default)]
    pub tags: String,
    /// Track duration in milliseconds
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Measured audio descriptors, if known
    #[serde(default)]
    pub audio: AudioFeatures,
}

impl TrackRecord {
    /// Create a record with no album, tags, duration or audio descriptors
    pub fn new(
        track_id: impl Into<String>,
        artist: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            track_id: track_id.into(),
            artist: artist.into(),
            title: title.into(),
            album: String::new(),
            tags: String::new(),
            duration_ms: None,
            audio: AudioFeatures::default(),
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_audio(mut self, audio: AudioFeatures) -> Self {
        self.audio = audio;
        self
    }

    /// Normalized (artist, title) identity of this track
    pub fn key(&self) -> TrackKey {
        TrackKey::new(&self.artist, &self.title)
    }

    /// Normalized artist name used for hard-negative matching
    pub fn artist_key(&self) -> String {
        normalize(&self.artist)
    }
}

/// Normalized composite key: trimmed, lowercased artist and title
///
/// Two records with the same key are treated as the same song regardless of
/// their track identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackKey {
    artist: String,
    title: String,
}

impl TrackKey {
    pub fn new(artist: &str, title: &str) -> Self {
        Self {
            artist: normalize(artist),
            title: normalize(title),
        }
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.artist, self.title)
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Partially known audio descriptors as read from the source data
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub danceability: Option<f32>,
    pub energy: Option<f32>,
    pub speechiness: Option<f32>,
    pub acousticness: Option<f32>,
    pub instrumentalness: Option<f32>,
    pub liveness: Option<f32>,
    pub valence: Option<f32>,
    pub tempo: Option<f32>,
    pub loudness: Option<f32>,
}

impl AudioFeatures {
    /// Descriptors in feature-vector order
    pub fn to_array(&self) -> [Option<f32>; 9] {
        [
            self.danceability,
            self.energy,
            self.speechiness,
            self.acousticness,
            self.instrumentalness,
            self.liveness,
            self.valence,
            self.tempo,
            self.loudness,
        ]
    }

    /// True when no descriptor is known
    pub fn is_empty(&self) -> bool {
        self.to_array().iter().all(Option::is_none)
    }

    /// Count of known descriptors
    pub fn known_count(&self) -> usize {
        self.to_array().iter().filter(|v| v.is_some()).count()
    }

    /// Replace every missing descriptor with `default`
    pub fn impute(&self, default: f32) -> AudioDescriptors {
        AudioDescriptors::from_array(self.to_array().map(|v| v.unwrap_or(default)))
    }

    /// Replace every missing descriptor with the matching value of `fallback`
    pub fn fill_from(&self, fallback: &AudioDescriptors) -> AudioDescriptors {
        let fallback = fallback.to_array();
        let mut values = [0.0f32; 9];
        for (i, known) in self.to_array().into_iter().enumerate() {
            values[i] = known.unwrap_or(fallback[i]);
        }
        AudioDescriptors::from_array(values)
    }
}

impl From<AudioDescriptors> for AudioFeatures {
    fn from(d: AudioDescriptors) -> Self {
        Self {
            danceability: Some(d.danceability),
            energy: Some(d.energy),
            speechiness: Some(d.speechiness),
            acousticness: Some(d.acousticness),
            instrumentalness: Some(d.instrumentalness),
            liveness: Some(d.liveness),
            valence: Some(d.valence),
            tempo: Some(d.tempo),
            loudness: Some(d.loudness),
        }
    }
}

/// Fully populated audio descriptors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioDescriptors {
    pub danceability: f32,
    pub energy: f32,
    pub speechiness: f32,
    pub acousticness: f32,
    pub instrumentalness: f32,
    pub liveness: f32,
    pub valence: f32,
    /// Beats per minute
    pub tempo: f32,
    /// Decibels
    pub loudness: f32,
}

impl AudioDescriptors {
    pub fn from_array(values: [f32; 9]) -> Self {
        Self {
            danceability: values[0],
            energy: values[1],
            speechiness: values[2],
            acousticness: values[3],
            instrumentalness: values[4],
            liveness: values[5],
            valence: values[6],
            tempo: values[7],
            loudness: values[8],
        }
    }

    /// Descriptors in feature-vector order (see [`AUDIO_FEATURE_NAMES`])
    pub fn to_array(&self) -> [f32; 9] {
        [
            self.danceability,
            self.energy,
            self.speechiness,
            self.acousticness,
            self.instrumentalness,
            self.liveness,
            self.valence,
            self.tempo,
            self.loudness,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalization() {
        let a = TrackKey::new("  Daft Punk ", "One More Time");
        let b = TrackKey::new("daft punk", "ONE MORE TIME  ");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "daft punk|one more time");
    }

    #[test]
    fn test_key_distinguishes_titles() {
        let a = TrackKey::new("Daft Punk", "One More Time");
        let b = TrackKey::new("Daft Punk", "Aerodynamic");
        assert_ne!(a, b);
        assert_eq!(a.artist(), b.artist());
        assert_eq!(a.title(), "one more time");
        assert_eq!(b.title(), "aerodynamic");
    }

    #[test]
    fn test_impute_missing_descriptors() {
        let features = AudioFeatures {
            energy: Some(0.9),
            tempo: Some(128.0),
            ..Default::default()
        };
        let imputed = features.impute(0.5);
        assert_eq!(imputed.energy, 0.9);
        assert_eq!(imputed.tempo, 128.0);
        assert_eq!(imputed.danceability, 0.5);
        assert_eq!(imputed.loudness, 0.5);
        assert_eq!(features.known_count(), 2);
    }

    #[test]
    fn test_empty_features_impute_to_constant() {
        let features = AudioFeatures::default();
        assert!(features.is_empty());
        assert_eq!(features.impute(0.5).to_array(), [0.5; 9]);
    }

    #[test]
    fn test_fill_from_prefers_known_values() {
        let features = AudioFeatures {
            valence: Some(0.1),
            ..Default::default()
        };
        let fallback = AudioDescriptors::from_array([0.2; 9]);
        let filled = features.fill_from(&fallback);
        assert_eq!(filled.valence, 0.1);
        assert_eq!(filled.energy, 0.2);
    }

    #[test]
    fn test_descriptor_array_order_matches_names() {
        let d = AudioDescriptors::from_array([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(d.danceability, 1.0);
        assert_eq!(d.tempo, 8.0);
        assert_eq!(d.loudness, 9.0);
        assert_eq!(AUDIO_FEATURE_NAMES[7], "tempo");
        assert_eq!(AudioFeatures::from(d).to_array()[8], Some(9.0));
    }
}
