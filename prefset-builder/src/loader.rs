//! CSV track loading
//!
//! Reads catalog exports with a header row. Column names vary between
//! sources, so common aliases are accepted:
//!
//! | field | accepted headers |
//! |---|---|
//! | track id | `track_id`, `id` |
//! | artist | `artist`, `artists` |
//! | title | `title`, `track_name`, `name` |
//! | album | `album`, `album_name` |
//! | tags | `tags`, `genre` |
//!
//! Audio descriptor columns use their plain names. Unknown columns are
//! ignored. Empty or unparsable numeric cells load as missing values.
//!
//! A single file can also carry both sides of a training set through a
//! binary `label` column: rows labeled 1 are positives, every other row joins
//! the candidate pool (see [`read_labeled_tracks`]).

use prefset_common::{AudioFeatures, Error, Result, TrackRecord};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct TrackRow {
    #[serde(default, alias = "id")]
    track_id: Option<String>,
    #[serde(default, alias = "artists")]
    artist: Option<String>,
    #[serde(default, alias = "track_name", alias = "name")]
    title: Option<String>,
    #[serde(default, alias = "album_name")]
    album: Option<String>,
    #[serde(default, alias = "genre")]
    tags: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    label: Option<u8>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    duration_ms: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    danceability: Option<f32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    energy: Option<f32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    speechiness: Option<f32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    acousticness: Option<f32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    instrumentalness: Option<f32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    liveness: Option<f32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    valence: Option<f32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    tempo: Option<f32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    loudness: Option<f32>,
}

impl TrackRow {
    /// Convert to a record; rows without artist and title are unusable
    fn into_record(self, row_index: usize) -> Option<TrackRecord> {
        let artist = self.artist.unwrap_or_default();
        let title = self.title.unwrap_or_default();
        if artist.trim().is_empty() && title.trim().is_empty() {
            return None;
        }

        let track_id = self
            .track_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("row-{}", row_index));

        Some(TrackRecord {
            track_id,
            artist,
            title,
            album: self.album.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
            duration_ms: self
                .duration_ms
                .filter(|ms| ms.is_finite() && *ms >= 0.0)
                .map(|ms| ms.round() as u64),
            audio: AudioFeatures {
                danceability: self.danceability,
                energy: self.energy,
                speechiness: self.speechiness,
                acousticness: self.acousticness,
                instrumentalness: self.instrumentalness,
                liveness: self.liveness,
                valence: self.valence,
                tempo: self.tempo,
                loudness: self.loudness,
            },
        })
    }
}

/// Load track records from a CSV file
pub fn load_tracks(path: &Path) -> Result<Vec<TrackRecord>> {
    info!("Loading tracks from {}", path.display());
    let file = std::fs::File::open(path)?;
    let tracks = read_tracks(file)?;
    info!(count = tracks.len(), "Loaded tracks from {}", path.display());
    Ok(tracks)
}

/// Read track records from any CSV source
///
/// A `label` column, if present, is ignored.
pub fn read_tracks<R: Read>(reader: R) -> Result<Vec<TrackRecord>> {
    Ok(read_rows(reader)?.into_iter().map(|(track, _)| track).collect())
}

/// Tracks from a labeled file, split by label
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledTracks {
    /// Rows labeled 1
    pub positives: Vec<TrackRecord>,
    /// Rows labeled 0 or unlabeled
    pub pool: Vec<TrackRecord>,
}

/// Read a CSV with a binary `label` column into positives and pool
///
/// # Errors
/// `Error::InvalidInput` when a label is neither 0 nor 1.
pub fn read_labeled_tracks<R: Read>(reader: R) -> Result<LabeledTracks> {
    let mut labeled = LabeledTracks::default();
    let mut unlabeled = 0usize;

    for (track, label) in read_rows(reader)? {
        match label {
            Some(1) => labeled.positives.push(track),
            Some(0) => labeled.pool.push(track),
            Some(other) => {
                return Err(Error::InvalidInput(format!(
                    "track {} has label {}, expected 0 or 1",
                    track.track_id, other
                )))
            }
            None => {
                unlabeled += 1;
                labeled.pool.push(track);
            }
        }
    }

    if unlabeled > 0 {
        warn!(unlabeled, "Rows without a label were added to the candidate pool");
    }
    debug!(
        positives = labeled.positives.len(),
        pool = labeled.pool.len(),
        "Split labeled tracks"
    );

    Ok(labeled)
}

/// Load a labeled CSV file into positives and pool
pub fn load_labeled_tracks(path: &Path) -> Result<LabeledTracks> {
    info!("Loading labeled tracks from {}", path.display());
    read_labeled_tracks(std::fs::File::open(path)?)
}

fn read_rows<R: Read>(reader: R) -> Result<Vec<(TrackRecord, Option<u8>)>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (index, row) in csv_reader.deserialize::<TrackRow>().enumerate() {
        let row = row?;
        let label = row.label;
        match row.into_record(index) {
            Some(track) => rows.push((track, label)),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped, "Skipped rows with neither artist nor title");
    }
    debug!(count = rows.len(), "Parsed track rows");

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct PredictionRow {
    label: u8,
    score: f64,
}

/// Read `label,score` rows for offline evaluation
pub fn read_predictions<R: Read>(reader: R) -> Result<(Vec<u8>, Vec<f64>)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut labels = Vec::new();
    let mut scores = Vec::new();
    for row in csv_reader.deserialize::<PredictionRow>() {
        let row = row?;
        labels.push(row.label);
        scores.push(row.score);
    }
    Ok((labels, scores))
}

/// Load `label,score` rows from a CSV file
pub fn load_predictions(path: &Path) -> Result<(Vec<u8>, Vec<f64>)> {
    read_predictions(std::fs::File::open(path)?)
}
