//! Error types for Tintcut.

use thiserror::Error;

/// Main error type for Tintcut operations.
#[derive(Error, Debug)]
pub enum TintcutError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Timed out after {millis} ms waiting for metadata of {name}")]
    MetadataTimeout { name: String, millis: u64 },

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("An export is already in progress")]
    ExportInProgress,

    #[error("Export not supported in this environment: {0}")]
    UnsupportedRuntime(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid trim window: start {start} must be before end {end} within {duration}")]
    InvalidTrim { start: f64, end: f64, duration: f64 },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Tintcut operations.
pub type Result<T> = std::result::Result<T, TintcutError>;
