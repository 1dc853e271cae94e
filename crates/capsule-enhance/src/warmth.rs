//! Uniform warm/cool color overlay.

use capsule_core::{BlendMode, Color, RasterImage};
use rayon::prelude::*;

/// Warm tint, screened over the frame for positive warmth.
pub const WARM_TINT: Color = Color::rgb(1.0, 170.0 / 255.0, 120.0 / 255.0);

/// Cool tint, multiplied over the frame for negative warmth.
pub const COOL_TINT: Color = Color::rgb(120.0 / 255.0, 170.0 / 255.0, 1.0);

/// Tint, blend mode and opacity for a warmth value, or `None` when `warmth == 0`.
pub fn overlay_for(warmth: f32) -> Option<(Color, BlendMode, f32)> {
    if warmth == 0.0 {
        return None;
    }
    let opacity = warmth.abs().clamp(0.0, 0.5);
    Some(if warmth >= 0.0 {
        (WARM_TINT, BlendMode::Screen, opacity)
    } else {
        (COOL_TINT, BlendMode::Multiply, opacity)
    })
}

/// Blend the warmth overlay over an RGBA8 raster in place.
pub fn apply_warmth(raster: &mut RasterImage, warmth: f32) {
    let Some((tint, mode, opacity)) = overlay_for(warmth) else {
        return;
    };
    let stride = raster.stride();
    raster.data_mut().par_chunks_mut(stride).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            mode.composite_px(px, tint, opacity);
        }
    });
}
