//! Common error types for prefset

use thiserror::Error;

/// Common result type for prefset operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the prefset crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read or decode error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML config file could not be parsed
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Configuration loading or validation error, including a required
    /// collaborator (such as the text encoder) being unavailable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Too few positive examples to build a training set
    #[error("Insufficient data: {found} positive examples, at least {required} required")]
    InsufficientData { found: usize, required: usize },

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Text encoder produced unusable output
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Model artifact could not be used
    #[error("Model error: {0}")]
    Model(String),
}
