//! Error types for the capsule pipeline.

use thiserror::Error;

/// Main error type for capsule operations.
#[derive(Error, Debug)]
pub enum CapsuleError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input bytes could not be decoded into a raster.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A drawing surface or output buffer could not be allocated.
    #[error("Render target error: {0}")]
    RenderTarget(String),

    /// Apparel detection failed. Callers degrade this to an empty label list.
    #[error("Detection error: {0}")]
    Detection(String),

    /// The external encoding engine could not be initialized.
    #[error("Encoder unavailable: {0}")]
    EncoderUnavailable(String),

    /// The encoder failed while producing the video.
    #[error("Encode error: {0}")]
    Encode(String),

    /// An operation was requested from a state that does not allow it.
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Frame index {index} out of range (0-{max})")]
    InvalidFrameIndex { index: u32, max: u32 },

    /// A requested item does not exist, such as an image index past the batch.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for capsule operations.
pub type Result<T> = std::result::Result<T, CapsuleError>;
