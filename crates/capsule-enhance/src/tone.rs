//! Tone and color adjustment: brightness, saturation, contrast.
//!
//! Applied in that order, each stage clamped to `[0, 1]` like a chain of
//! CSS filter functions.

use capsule_core::color::unit_to_u8;
use capsule_core::{EnhancementSettings, RasterImage};
use rayon::prelude::*;

/// Luma weights used by the saturation matrix.
const LUMA: [f32; 3] = [0.213, 0.715, 0.072];

/// Per-pixel tone adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneAdjust {
    pub brightness: f32,
    pub saturation: f32,
    pub contrast: f32,
}

impl ToneAdjust {
    pub const IDENTITY: Self = Self {
        brightness: 1.0,
        saturation: 1.0,
        contrast: 1.0,
    };

    /// Tone parameters derived from enhancement settings.
    pub fn from_settings(settings: &EnhancementSettings) -> Self {
        Self {
            brightness: settings.brightness(),
            saturation: settings.saturation(),
            contrast: settings.contrast(),
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Adjust one normalized RGB triple.
    #[inline]
    pub fn apply_rgb(&self, rgb: [f32; 3]) -> [f32; 3] {
        let bright = rgb.map(|c| (c * self.brightness).clamp(0.0, 1.0));
        let luma = bright[0] * LUMA[0] + bright[1] * LUMA[1] + bright[2] * LUMA[2];
        let sat = bright.map(|c| (luma + (c - luma) * self.saturation).clamp(0.0, 1.0));
        sat.map(|c| ((c - 0.5) * self.contrast + 0.5).clamp(0.0, 1.0))
    }

    /// Adjust an RGBA8 raster in place. Alpha is untouched.
    pub fn apply(&self, raster: &mut RasterImage) {
        if self.is_identity() {
            return;
        }
        let stride = raster.stride();
        raster.data_mut().par_chunks_mut(stride).for_each(|row| {
            for px in row.chunks_exact_mut(4) {
                let out = self.apply_rgb([
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                ]);
                px[0] = unit_to_u8(out[0]);
                px[1] = unit_to_u8(out[1]);
                px[2] = unit_to_u8(out[2]);
            }
        });
    }
}
