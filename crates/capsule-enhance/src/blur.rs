//! Separable Gaussian blur used as the denoise stage.

use capsule_core::color::unit_to_u8;
use capsule_core::{ChannelLayout, CapsuleError, RasterImage, Result};
use rayon::prelude::*;

/// Normalized 1D Gaussian kernel for `sigma`, radius `ceil(3 * sigma)`.
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil().max(1.0) as i32;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Blur an RGBA8 raster in place with standard deviation `sigma` (pixels).
///
/// A non-positive sigma is a no-op. Edges clamp.
pub fn gaussian_blur(raster: &mut RasterImage, sigma: f32) -> Result<()> {
    if sigma <= 0.0 {
        return Ok(());
    }
    if raster.layout() != ChannelLayout::Rgba8 {
        return Err(CapsuleError::RenderTarget(format!(
            "blur expects RGBA8, got {:?}",
            raster.layout()
        )));
    }

    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as i64;
    let (w, h) = raster.dimensions();
    let stride = raster.stride();

    // Horizontal pass into scratch.
    let mut tmp = vec![0f32; stride * h as usize];
    {
        let src = raster.data();
        tmp.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
            let src_row = &src[y * stride..(y + 1) * stride];
            for x in 0..w as i64 {
                for c in 0..4 {
                    let mut acc = 0.0;
                    for (k, weight) in kernel.iter().enumerate() {
                        let sx = (x + k as i64 - radius).clamp(0, w as i64 - 1) as usize;
                        acc += src_row[sx * 4 + c] as f32 * weight;
                    }
                    row[x as usize * 4 + c] = acc;
                }
            }
        });
    }

    // Vertical pass back into the raster.
    raster
        .data_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for (i, out) in row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let sy = (y as i64 + k as i64 - radius).clamp(0, h as i64 - 1) as usize;
                    acc += tmp[sy * stride + i] * weight;
                }
                *out = unit_to_u8(acc / 255.0);
            }
        });

    Ok(())
}
