//! # prefset Common Library
//!
//! Shared code for the prefset tools including:
//! - Error type and result alias
//! - Configuration loading (TOML, environment, compiled defaults)
//! - Track data model (records, normalized keys, audio descriptors)

pub mod config;
pub mod error;
pub mod track;

pub use error::{Error, Result};
pub use track::{AudioDescriptors, AudioFeatures, TrackKey, TrackRecord, AUDIO_FEATURE_NAMES};
