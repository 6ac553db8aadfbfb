//! Feature Vector Builder
//!
//! Maps a track record to a fixed-length numeric vector:
//!
//! ```text
//! [ text embedding (text_dim) | danceability energy speechiness acousticness
//!   instrumentalness liveness valence tempo loudness ]
//! ```
//!
//! The text block always comes first and the audio block second. Models
//! persisted from one layout cannot be used with another.
//!
//! # Text Block
//! `artist title [album] [tags]`, with `|`/`,` separated tags normalized to
//! spaces, encoded by the injected [`TextEncoder`].
//!
//! # Audio Block
//! The 9 measured descriptors; any missing one is imputed with
//! [`NEUTRAL_AUDIO_VALUE`].
//!
//! # Pipelines
//! [`FeaturePipeline`] picks between the fused layout above and an audio-only
//! layout (9 values, rule-based estimates for missing descriptors) depending
//! on whether a text encoder is available.

use crate::encoder::{check_dim, TextEncoder};
use crate::estimator::{AudioEstimator, RuleBasedEstimator};
use prefset_common::{AudioDescriptors, Error, Result, TrackRecord, AUDIO_FEATURE_NAMES};
use std::sync::Arc;
use tracing::{debug, info};

/// Width of the audio block
pub const AUDIO_DIM: usize = AUDIO_FEATURE_NAMES.len();

/// Imputed value for a missing audio descriptor
pub const NEUTRAL_AUDIO_VALUE: f32 = 0.5;

/// Join a track's descriptive text for encoding
///
/// Empty album and tags are skipped; tags separated by `|` or `,` become
/// single-space separated.
pub fn track_text(track: &TrackRecord) -> String {
    let mut text = format!("{} {}", track.artist.trim(), track.title.trim());

    let album = track.album.trim();
    if !album.is_empty() {
        text.push(' ');
        text.push_str(album);
    }

    let tags = normalize_tags(&track.tags);
    if !tags.is_empty() {
        text.push(' ');
        text.push_str(&tags);
    }

    text
}

/// Normalize a `|`- or `,`-separated tag list to space-separated
pub fn normalize_tags(tags: &str) -> String {
    tags.split(|c| c == '|' || c == ',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Audio block with missing descriptors imputed to the neutral value
pub fn audio_block(track: &TrackRecord) -> [f32; AUDIO_DIM] {
    track.audio.impute(NEUTRAL_AUDIO_VALUE).to_array()
}

/// Builds fused text + audio vectors
///
/// Requires a text encoder; construction succeeds without one so callers can
/// hold a builder and learn about the missing encoder at first use.
#[derive(Clone)]
pub struct FeatureVectorBuilder {
    encoder: Option<Arc<dyn TextEncoder>>,
}

impl FeatureVectorBuilder {
    pub fn new(encoder: Option<Arc<dyn TextEncoder>>) -> Self {
        Self { encoder }
    }

    pub fn with_encoder(encoder: Arc<dyn TextEncoder>) -> Self {
        Self::new(Some(encoder))
    }

    pub fn has_encoder(&self) -> bool {
        self.encoder.is_some()
    }

    /// Output width, `text_dim + 9`; errors when no encoder is configured
    pub fn dim(&self) -> Result<usize> {
        Ok(self.encoder()?.dim() + AUDIO_DIM)
    }

    /// Build the fused vector for one track
    ///
    /// # Errors
    /// - `Error::Configuration` if no text encoder is available
    /// - `Error::Encoding` if the encoder returns the wrong width
    pub fn build(&self, track: &TrackRecord) -> Result<Vec<f32>> {
        let encoder = self.encoder()?;
        let embedding = encoder.encode(&track_text(track))?;
        check_dim(encoder.as_ref(), &embedding)?;
        Ok(fuse(embedding, track))
    }

    /// Build fused vectors for many tracks, same order as input
    pub fn build_batch(&self, tracks: &[&TrackRecord]) -> Result<Vec<Vec<f32>>> {
        let encoder = self.encoder()?;
        let texts: Vec<String> = tracks.iter().map(|track| track_text(track)).collect();
        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embeddings = encoder.encode_batch(&text_refs)?;

        if embeddings.len() != tracks.len() {
            return Err(Error::Encoding(format!(
                "{} encoder returned {} embeddings for {} texts",
                encoder.name(),
                embeddings.len(),
                tracks.len()
            )));
        }

        embeddings
            .into_iter()
            .zip(tracks)
            .map(|(embedding, track)| {
                check_dim(encoder.as_ref(), &embedding)?;
                Ok(fuse(embedding, track))
            })
            .collect()
    }

    fn encoder(&self) -> Result<&Arc<dyn TextEncoder>> {
        self.encoder.as_ref().ok_or_else(|| {
            Error::Configuration(
                "text encoder unavailable; fused feature vectors cannot be built".to_string(),
            )
        })
    }
}

fn fuse(mut embedding: Vec<f32>, track: &TrackRecord) -> Vec<f32> {
    embedding.extend_from_slice(&audio_block(track));
    embedding
}

/// Feature layout strategy, selected by text encoder availability
#[derive(Clone)]
pub enum FeaturePipeline {
    /// Text embedding + imputed audio block
    Fused(FeatureVectorBuilder),
    /// Audio block only, missing descriptors estimated
    AudioOnly(AudioEstimator),
}

impl FeaturePipeline {
    /// Fused layout when an encoder is available, rule-based audio-only otherwise
    pub fn select(encoder: Option<Arc<dyn TextEncoder>>) -> Self {
        match encoder {
            Some(encoder) => {
                info!(
                    encoder = encoder.name(),
                    dim = encoder.dim() + AUDIO_DIM,
                    "Using fused text + audio features"
                );
                FeaturePipeline::Fused(FeatureVectorBuilder::with_encoder(encoder))
            }
            None => {
                info!(dim = AUDIO_DIM, "Text encoder unavailable, using audio-only features");
                FeaturePipeline::AudioOnly(AudioEstimator::RuleBased(RuleBasedEstimator::new()))
            }
        }
    }

    /// Vector width produced by this pipeline
    pub fn dim(&self) -> usize {
        match self {
            FeaturePipeline::Fused(builder) => builder.dim().unwrap_or(AUDIO_DIM),
            FeaturePipeline::AudioOnly(_) => AUDIO_DIM,
        }
    }

    pub fn is_fused(&self) -> bool {
        matches!(self, FeaturePipeline::Fused(_))
    }

    /// Vectorize one track
    pub fn vectorize(&self, track: &TrackRecord) -> Result<Vec<f32>> {
        match self {
            FeaturePipeline::Fused(builder) => builder.build(track),
            FeaturePipeline::AudioOnly(estimator) => {
                Ok(audio_only_block(estimator, track)?.to_array().to_vec())
            }
        }
    }

    /// Vectorize many tracks into a matrix of uniform width
    pub fn vectorize_all(&self, tracks: &[&TrackRecord]) -> Result<FeatureMatrix> {
        let rows = match self {
            FeaturePipeline::Fused(builder) => builder.build_batch(tracks)?,
            FeaturePipeline::AudioOnly(_) => tracks
                .iter()
                .map(|track| self.vectorize(track))
                .collect::<Result<Vec<_>>>()?,
        };
        debug!(rows = rows.len(), dim = self.dim(), "Vectorized tracks");
        FeatureMatrix::new(self.dim(), rows)
    }
}

impl std::fmt::Debug for FeaturePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeaturePipeline::Fused(_) => write!(f, "Fused(dim={})", self.dim()),
            FeaturePipeline::AudioOnly(estimator) => {
                f.debug_tuple("AudioOnly").field(estimator).finish()
            }
        }
    }
}

/// Measured descriptors where known, estimates for the rest
fn audio_only_block(estimator: &AudioEstimator, track: &TrackRecord) -> Result<AudioDescriptors> {
    if track.audio.known_count() == AUDIO_DIM {
        return Ok(track.audio.impute(NEUTRAL_AUDIO_VALUE));
    }
    let estimate = estimator.estimate(track)?;
    Ok(track.audio.fill_from(&estimate))
}

/// Row-major feature matrix with a fixed row width
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    dim: usize,
    rows: Vec<Vec<f32>>,
}

impl FeatureMatrix {
    /// Wrap rows, rejecting any row whose width differs from `dim`
    pub fn new(dim: usize, rows: Vec<Vec<f32>>) -> Result<Self> {
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != dim) {
            return Err(Error::InvalidInput(format!(
                "feature row {} has {} values, expected {}",
                i,
                row.len(),
                dim
            )));
        }
        Ok(Self { dim, rows })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn into_rows(self) -> Vec<Vec<f32>> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::HashingEncoder;
    use prefset_common::AudioFeatures;

    fn hashing(dim: usize) -> Arc<dyn TextEncoder> {
        Arc::new(HashingEncoder::new(dim))
    }

    #[test]
    fn test_track_text_joins_parts() {
        let track = TrackRecord::new("t", "Daft Punk", "Digital Love")
            .with_album("Discovery")
            .with_tags("house|french house, electronic");
        assert_eq!(
            track_text(&track),
            "Daft Punk Digital Love Discovery house french house electronic"
        );
    }

    #[test]
    fn test_track_text_skips_empty_parts() {
        let track = TrackRecord::new("t", "Daft Punk", "Digital Love").with_tags(" | ,");
        assert_eq!(track_text(&track), "Daft Punk Digital Love");
    }

    #[test]
    fn test_fused_layout() {
        let audio = AudioFeatures {
            danceability: Some(0.9),
            loudness: Some(-5.0),
            ..Default::default()
        };
        let track = TrackRecord::new("t", "A", "B").with_audio(audio);
        let builder = FeatureVectorBuilder::with_encoder(hashing(16));

        let vector = builder.build(&track).unwrap();
        assert_eq!(vector.len(), 16 + AUDIO_DIM);
        assert_eq!(vector[16], 0.9);
        assert_eq!(vector[17], NEUTRAL_AUDIO_VALUE);
        assert_eq!(vector[24], -5.0);
    }

    #[test]
    fn test_missing_audio_imputed() {
        let track = TrackRecord::new("t", "A", "B");
        let vector = FeatureVectorBuilder::with_encoder(hashing(8)).build(&track).unwrap();
        assert_eq!(&vector[8..], &[0.5; AUDIO_DIM]);
    }

    #[test]
    fn test_builder_without_encoder() {
        let builder = FeatureVectorBuilder::new(None);
        assert!(!builder.has_encoder());
        assert!(matches!(builder.dim(), Err(Error::Configuration(_))));
        let result = builder.build(&TrackRecord::new("t", "A", "B"));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    struct ShortEncoder;

    impl TextEncoder for ShortEncoder {
        fn name(&self) -> &'static str {
            "short"
        }

        fn dim(&self) -> usize {
            4
        }

        fn encode(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0; 2])
        }
    }

    #[test]
    fn test_encoder_width_checked() {
        let builder = FeatureVectorBuilder::with_encoder(Arc::new(ShortEncoder));
        let result = builder.build(&TrackRecord::new("t", "A", "B"));
        assert!(matches!(result, Err(Error::Encoding(_))));
    }

    #[test]
    fn test_batch_matches_single() {
        let builder = FeatureVectorBuilder::with_encoder(hashing(12));
        let a = TrackRecord::new("a", "Muse", "Uprising").with_tags("rock");
        let b = TrackRecord::new("b", "Bjork", "Joga");
        let batch = builder.build_batch(&[&a, &b]).unwrap();
        assert_eq!(batch[0], builder.build(&a).unwrap());
        assert_eq!(batch[1], builder.build(&b).unwrap());
    }

    #[test]
    fn test_pipeline_selection() {
        let fused = FeaturePipeline::select(Some(hashing(384)));
        assert!(fused.is_fused());
        assert_eq!(fused.dim(), 393);

        let audio_only = FeaturePipeline::select(None);
        assert!(!audio_only.is_fused());
        assert_eq!(audio_only.dim(), AUDIO_DIM);
    }

    #[test]
    fn test_audio_only_uses_estimates_for_missing() {
        let audio = AudioFeatures {
            valence: Some(0.05),
            ..Default::default()
        };
        let track = TrackRecord::new("t", "Slipknot", "Duality")
            .with_tags("metal")
            .with_duration_ms(250_000)
            .with_audio(audio);
        let vector = FeaturePipeline::select(None).vectorize(&track).unwrap();

        assert_eq!(vector.len(), AUDIO_DIM);
        assert_eq!(vector[1], 0.9); // estimated energy
        assert_eq!(vector[6], 0.05); // measured valence
        assert_eq!(vector[8], -4.0); // estimated loudness
    }

    #[test]
    fn test_vectorize_all_uniform_width() {
        let pipeline = FeaturePipeline::select(Some(hashing(32)));
        let a = TrackRecord::new("a", "Muse", "Uprising");
        let b = TrackRecord::new("b", "Bjork", "Joga").with_album("Homogenic");
        let matrix = pipeline.vectorize_all(&[&a, &b]).unwrap();
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.dim(), 41);
        assert!(matrix.rows().iter().all(|row| row.len() == 41));
        assert_eq!(matrix.row(1).map(<[f32]>::len), Some(41));
        assert_eq!(matrix.row(0), Some(pipeline.vectorize(&a).unwrap().as_slice()));
        assert!(matrix.row(2).is_none());
    }

    #[test]
    fn test_matrix_rejects_ragged_rows() {
        let result = FeatureMatrix::new(3, vec![vec![0.0; 3], vec![0.0; 2]]);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
