//! Capsule Enhance - CPU filter pipeline for user photos
//!
//! Fixed-order pipeline, each stage in its own module:
//! 1. Bicubic resampling (upscale only)
//! 2. Tone: brightness, saturation, contrast
//! 3. Gaussian denoise blur
//! 4. Warmth overlay (screen / multiply)

pub mod blur;
pub mod pipeline;
pub mod resample;
pub mod tone;
pub mod warmth;

pub use pipeline::{enhance, enhance_bytes};
pub use tone::ToneAdjust;
