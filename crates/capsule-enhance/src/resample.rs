//! Bicubic (Catmull-Rom) resampling.
//!
//! Separable two-pass filter: horizontal into an f32 scratch buffer, then
//! vertical into the output. Rows are processed in parallel; every output
//! pixel depends only on the source, so results are deterministic.

use capsule_core::color::unit_to_u8;
use capsule_core::{ChannelLayout, CapsuleError, RasterImage, Result};
use rayon::prelude::*;

/// Catmull-Rom tension.
const A: f32 = -0.5;

/// Cubic convolution kernel.
#[inline]
fn cubic(x: f32) -> f32 {
    let x = x.abs();
    if x <= 1.0 {
        ((A + 2.0) * x - (A + 3.0)) * x * x + 1.0
    } else if x < 2.0 {
        ((A * x - 5.0 * A) * x + 8.0 * A) * x - 4.0 * A
    } else {
        0.0
    }
}

/// Four source taps for one destination coordinate.
#[derive(Debug, Clone, Copy)]
struct Taps {
    index: [usize; 4],
    weight: [f32; 4],
}

fn taps_for_axis(src_len: u32, dst_len: u32) -> Vec<Taps> {
    let scale = src_len as f32 / dst_len as f32;
    let max = src_len as i64 - 1;
    (0..dst_len)
        .map(|d| {
            let center = (d as f32 + 0.5) * scale - 0.5;
            let base = center.floor();
            let frac = center - base;
            let mut index = [0usize; 4];
            let mut weight = [0f32; 4];
            for k in 0..4 {
                let offset = k as i64 - 1;
                index[k] = (base as i64 + offset).clamp(0, max) as usize;
                weight[k] = cubic(frac - offset as f32);
            }
            let sum: f32 = weight.iter().sum();
            for w in &mut weight {
                *w /= sum;
            }
            Taps { index, weight }
        })
        .collect()
}

/// Resample an RGBA8 raster to `out_w`x`out_h`.
pub fn resample_bicubic(src: &RasterImage, out_w: u32, out_h: u32) -> Result<RasterImage> {
    if src.layout() != ChannelLayout::Rgba8 {
        return Err(CapsuleError::RenderTarget(format!(
            "resample expects RGBA8, got {:?}",
            src.layout()
        )));
    }
    let mut output = RasterImage::new(out_w, out_h, ChannelLayout::Rgba8, src.provenance().clone())?;
    if src.dimensions() == (out_w, out_h) {
        output.data_mut().copy_from_slice(src.data());
        return Ok(output);
    }

    let (src_w, src_h) = src.dimensions();
    let x_taps = taps_for_axis(src_w, out_w);
    let y_taps = taps_for_axis(src_h, out_h);

    // Horizontal pass: src_h rows of out_w pixels.
    let tmp_stride = out_w as usize * 4;
    let mut tmp = vec![0f32; tmp_stride * src_h as usize];
    tmp.par_chunks_mut(tmp_stride)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = src.row(y as u32);
            for (x, taps) in x_taps.iter().enumerate() {
                for c in 0..4 {
                    let mut acc = 0.0;
                    for k in 0..4 {
                        acc += src_row[taps.index[k] * 4 + c] as f32 * taps.weight[k];
                    }
                    row[x * 4 + c] = acc;
                }
            }
        });

    // Vertical pass.
    let out_stride = output.stride();
    output
        .data_mut()
        .par_chunks_mut(out_stride)
        .zip(y_taps.par_iter())
        .for_each(|(row, taps)| {
            for i in 0..tmp_stride {
                let mut acc = 0.0;
                for k in 0..4 {
                    acc += tmp[taps.index[k] * tmp_stride + i] * taps.weight[k];
                }
                row[i] = unit_to_u8(acc / 255.0);
            }
        });

    Ok(output)
}
