//! Capsule Core - Foundation types for photo enhancement and capsule rendering
//!
//! This crate provides the fundamental types used throughout the pipeline:
//! - Raster images and their provenance
//! - Color and blend formulas
//! - Enhancement settings and enhanced-image records
//! - Geometric primitives

pub mod color;
pub mod error;
pub mod geometry;
pub mod raster;
pub mod record;
pub mod settings;

pub use color::{BlendMode, Color};
pub use error::{CapsuleError, Result};
pub use geometry::{Rect, Vec2};
pub use raster::{ChannelLayout, Provenance, RasterImage, SharedRaster};
pub use record::{enhanced_file_name, EnhancedImage, VIDEO_FILE_NAME};
pub use settings::{EnhancementSettings, UpscaleFactor};

/// Fixed parameters of the capsule video.
pub mod capsule {
    /// Canvas width in pixels.
    pub const WIDTH: u32 = 1080;

    /// Canvas height in pixels.
    pub const HEIGHT: u32 = 1920;

    /// Frames per second fed to the encoder.
    pub const FPS: u32 = 20;

    /// Clip length in seconds.
    pub const DURATION_SECONDS: u32 = 12;

    /// Total number of synthesized frames.
    pub const TOTAL_FRAMES: u32 = FPS * DURATION_SECONDS;
}
