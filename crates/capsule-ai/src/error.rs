//! Error types for the detection adapter.

use thiserror::Error;

/// Errors a detector may report. The orchestrator never propagates these.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// The backing model is not loaded or not installed.
    #[error("Detection model unavailable: {0}")]
    ModelUnavailable(String),

    /// Inference ran but failed.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// The raster cannot be fed to the detector.
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),
}

impl From<DetectionError> for capsule_core::CapsuleError {
    fn from(e: DetectionError) -> Self {
        Self::Detection(e.to_string())
    }
}

/// Result type alias for detection.
pub type DetectionResult<T> = std::result::Result<T, DetectionError>;
