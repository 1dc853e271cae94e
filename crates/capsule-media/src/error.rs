//! Error types for the encoder driver.

use capsule_core::CapsuleError;
use thiserror::Error;

/// Errors from the encoding engine and its driver.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The engine binary or its working storage could not be set up.
    #[error("Encoding engine unavailable: {0}")]
    Unavailable(String),

    /// The engine ran and reported failure.
    #[error("Encoding failed: {0}")]
    Failed(String),

    /// A file could not be placed into or removed from engine storage.
    #[error("Staging error for {name}: {reason}")]
    Staging { name: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<EncodeError> for CapsuleError {
    fn from(e: EncodeError) -> Self {
        match e {
            EncodeError::Unavailable(msg) => Self::EncoderUnavailable(msg),
            EncodeError::Io(io) => Self::Io(io),
            other => Self::Encode(other.to_string()),
        }
    }
}

/// Result type alias for encoding.
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;
