//! Text encoders
//!
//! The feature builder maps each track's descriptive text to a fixed-width
//! embedding through a [`TextEncoder`]. Encoders are injected; the builder
//! never constructs one itself.
//!
//! [`HashingEncoder`] is the built-in encoder: word tokens are hashed with
//! SHA-256 into signed buckets and the result is L2-normalized. It needs no
//! model files, so it is always available when selected in config.

use prefset_common::config::{EncoderKind, FeatureConfig};
use prefset_common::{Error, Result};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};

/// Maps free text to a fixed-width embedding
pub trait TextEncoder: Send + Sync {
    /// Encoder name for logging
    fn name(&self) -> &'static str;

    /// Embedding width; every call to `encode` returns exactly this many values
    fn dim(&self) -> usize;

    /// Encode a single text
    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Encode a batch of texts, same order as input
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.encode(text)).collect()
    }
}

/// Build the encoder selected in config
///
/// Returns `None` when the config disables text encoding; callers pick an
/// audio-only pipeline in that case.
pub fn encoder_from_config(config: &FeatureConfig) -> Option<Arc<dyn TextEncoder>> {
    match config.encoder {
        EncoderKind::Hashing => {
            info!(dim = config.text_dim, "Using hashing text encoder");
            Some(Arc::new(HashingEncoder::new(config.text_dim)))
        }
        EncoderKind::None => {
            info!("Text encoder disabled in config");
            None
        }
    }
}

/// Deterministic feature-hashing encoder
#[derive(Debug, Clone)]
pub struct HashingEncoder {
    dim: usize,
}

impl HashingEncoder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    /// Lowercased alphanumeric word tokens
    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
    }

    /// Bucket index and sign for a token
    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut index_bytes = [0u8; 8];
        index_bytes.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(index_bytes) % self.dim as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl TextEncoder for HashingEncoder {
    fn name(&self) -> &'static str {
        "hashing"
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.dim];
        let mut token_count = 0usize;

        for token in Self::tokenize(text) {
            let (index, sign) = self.bucket(&token);
            embedding[index] += sign;
            token_count += 1;
        }

        // L2 normalize
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        debug!(tokens = token_count, dim = self.dim, "Hashed text embedding");
        Ok(embedding)
    }
}

/// Check an encoder's output width against the width it advertises
pub(crate) fn check_dim(encoder: &dyn TextEncoder, embedding: &[f32]) -> Result<()> {
    if embedding.len() != encoder.dim() {
        return Err(Error::Encoding(format!(
            "{} encoder returned {} values, expected {}",
            encoder.name(),
            embedding.len(),
            encoder.dim()
        )));
    }
    Ok(())
}
