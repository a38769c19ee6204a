//! Error types for MemeFill.

use thiserror::Error;

/// Main error type for MemeFill operations.
#[derive(Error, Debug)]
pub enum MemeFillError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The video could not be opened for reading.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias for MemeFill operations.
pub type Result<T> = std::result::Result<T, MemeFillError>;
