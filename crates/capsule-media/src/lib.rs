//! Capsule Media - FFmpeg integration for the capsule video
//!
//! This crate handles:
//! - The `EncodingEngine` seam (an isolated file store plus a run command)
//! - The FFmpeg-backed engine
//! - Frame staging with guaranteed cleanup
//! - The single-job encoder driver and its lazily loaded handle

pub mod driver;
pub mod engine;
pub mod error;
pub mod ffmpeg;
pub mod handle;
pub mod request;
pub mod staging;

pub use driver::{EncoderDriver, MonotonicProgress};
pub use engine::EncodingEngine;
pub use error::{EncodeError, EncodeResult};
pub use ffmpeg::{EngineConfig, FfmpegEngine};
pub use handle::{EncoderHandle, EngineLoader};
pub use request::{CapsuleEncodeArgs, EncodeRequest};
pub use staging::{frame_file_name, StagingGuard, OUTPUT_FILE_NAME};
