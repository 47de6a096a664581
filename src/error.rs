//! Error types for the mastery core
//!
//! All fallible operations return [`Result`], built on a single
//! thiserror-derived enum so callers can match on the failure class.

use thiserror::Error;

/// Main error type for mastery operations
#[derive(Error, Debug)]
pub enum MasteryError {
    /// Unknown event kind and no explicit weight supplied
    #[error("Invalid event kind: {0}")]
    InvalidEventKind(String),

    /// The embedding provider failed or returned an unusable vector
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Durable store I/O failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an unusable argument
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for mastery operations
pub type Result<T> = std::result::Result<T, MasteryError>;

impl From<rusqlite::Error> for MasteryError {
    fn from(err: rusqlite::Error) -> Self {
        MasteryError::Storage(err.to_string())
    }
}

impl From<toml::de::Error> for MasteryError {
    fn from(err: toml::de::Error) -> Self {
        MasteryError::Config(err.to_string())
    }
}
