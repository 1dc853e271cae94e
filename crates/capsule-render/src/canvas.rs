//! Opaque drawing surface with source-over compositing.
//!
//! Channels are kept as normalized `f32` so stacked translucent layers do
//! not accumulate 8-bit rounding; quantization happens once in `to_rgb8`.
//! Shapes get analytic edge coverage so fractional layout coordinates
//! render smoothly.

use capsule_core::color::unit_to_u8;
use capsule_core::{CapsuleError, ChannelLayout, Color, Provenance, RasterImage, Rect, Result};
use rayon::prelude::*;

/// An opaque RGB surface, initially black.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    width: u32,
    height: u32,
    px: Vec<[f32; 3]>,
}

impl Canvas {
    /// Allocate a black canvas.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .filter(|&n| n > 0)
            .ok_or_else(|| {
                CapsuleError::RenderTarget(format!("invalid canvas size {width}x{height}"))
            })?;
        let mut px = Vec::new();
        px.try_reserve_exact(len).map_err(|e| {
            CapsuleError::RenderTarget(format!("cannot allocate {width}x{height} canvas: {e}"))
        })?;
        px.resize(len, [0.0; 3]);
        Ok(Self { width, height, px })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Normalized RGB at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        self.px[y as usize * self.width as usize + x as usize]
    }

    /// Fill the whole surface with a top-to-bottom gradient.
    ///
    /// `stops` are `(offset, color)` pairs sorted by offset in `[0, 1]`.
    pub fn fill_vertical_gradient(&mut self, stops: &[(f32, Color)]) {
        if stops.is_empty() {
            return;
        }
        let (w, h) = (self.width as usize, self.height as f32);
        self.px.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            let color = sample_gradient(stops, (y as f32 + 0.5) / h);
            for px in row {
                blend(px, color, 1.0);
            }
        });
    }

    /// Fill an axis-aligned rectangle.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some((x0, y0, x1, y1)) = rect.pixel_span(self.width, self.height) else {
            return;
        };
        let w = self.width as usize;
        for y in y0..y1 {
            let cy = span_coverage(y, rect.y, rect.y + rect.height);
            let row = &mut self.px[y as usize * w..(y as usize + 1) * w];
            for x in x0..x1 {
                let cx = span_coverage(x, rect.x, rect.x + rect.width);
                blend(&mut row[x as usize], color, cx * cy);
            }
        }
    }

    /// Fill a rectangle with rounded corners.
    pub fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: Color) {
        let Some((x0, y0, x1, y1)) = rect.pixel_span(self.width, self.height) else {
            return;
        };
        let r = radius.min(rect.width * 0.5).min(rect.height * 0.5).max(0.0);
        let center = rect.center();
        let half_w = rect.width * 0.5 - r;
        let half_h = rect.height * 0.5 - r;
        let w = self.width as usize;

        for y in y0..y1 {
            for x in x0..x1 {
                // Signed distance to the rounded box, sampled at the pixel center.
                let qx = (x as f32 + 0.5 - center.x).abs() - half_w;
                let qy = (y as f32 + 0.5 - center.y).abs() - half_h;
                let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
                let dist = outside + qx.max(qy).min(0.0) - r;
                let coverage = (0.5 - dist).clamp(0.0, 1.0);
                blend(&mut self.px[y as usize * w + x as usize], color, coverage);
            }
        }
    }

    /// Draw the blurred shadow of an opaque rectangle, like a 2D canvas
    /// `shadowBlur` with zero offset. The blur radius maps to a Gaussian
    /// with `sigma = blur / 2`.
    pub fn drop_shadow(&mut self, rect: Rect, blur: f32, color: Color) {
        let sigma = (blur * 0.5).max(f32::EPSILON);
        let reach = rect.expand(sigma * 3.0);
        let Some((x0, y0, x1, y1)) = reach.pixel_span(self.width, self.height) else {
            return;
        };

        // The blurred box is separable: coverage(x, y) = gx(x) * gy(y).
        let gx: Vec<f32> = (x0..x1)
            .map(|x| blurred_span(x as f32 + 0.5, rect.x, rect.x + rect.width, sigma))
            .collect();
        let w = self.width as usize;
        self.px[y0 as usize * w..y1 as usize * w]
            .par_chunks_mut(w)
            .enumerate()
            .for_each(|(dy, row)| {
                let y = y0 as f32 + dy as f32 + 0.5;
                let gy = blurred_span(y, rect.y, rect.y + rect.height, sigma);
                if gy <= 0.0 {
                    return;
                }
                for (x, cx) in (x0..x1).zip(&gx) {
                    blend(&mut row[x as usize], color, cx * gy);
                }
            });
    }

    /// Draw an RGBA8 raster scaled into `dest` with bilinear sampling.
    /// Source alpha is respected; the parts of `dest` off the canvas are clipped.
    pub fn draw_image(&mut self, image: &RasterImage, dest: Rect) -> Result<()> {
        if image.layout() != ChannelLayout::Rgba8 {
            return Err(CapsuleError::RenderTarget(format!(
                "draw_image expects RGBA8, got {:?}",
                image.layout()
            )));
        }
        let Some((x0, y0, x1, y1)) = dest.pixel_span(self.width, self.height) else {
            return Ok(());
        };
        if dest.width <= 0.0 || dest.height <= 0.0 {
            return Ok(());
        }

        let (sw, sh) = image.dimensions();
        let scale_x = sw as f32 / dest.width;
        let scale_y = sh as f32 / dest.height;
        let w = self.width as usize;

        self.px[y0 as usize * w..y1 as usize * w]
            .par_chunks_mut(w)
            .enumerate()
            .for_each(|(dy, row)| {
                let y = y0 + dy as u32;
                let cy = span_coverage(y, dest.y, dest.y + dest.height);
                let sy = ((y as f32 + 0.5 - dest.y) * scale_y - 0.5).clamp(0.0, (sh - 1) as f32);
                for x in x0..x1 {
                    let cx = span_coverage(x, dest.x, dest.x + dest.width);
                    let sx =
                        ((x as f32 + 0.5 - dest.x) * scale_x - 0.5).clamp(0.0, (sw - 1) as f32);
                    let sample = sample_bilinear(image, sx, sy);
                    blend(&mut row[x as usize], sample, cx * cy);
                }
            });
        Ok(())
    }

    /// Blend a coverage mask of `mask_w` x `mask_h` bytes with its top-left
    /// corner at `(x, y)`.
    pub fn fill_mask(
        &mut self,
        x: i32,
        y: i32,
        mask_w: usize,
        mask_h: usize,
        mask: &[u8],
        color: Color,
    ) {
        let w = self.width as i32;
        let h = self.height as i32;
        for my in 0..mask_h {
            let py = y + my as i32;
            if py < 0 || py >= h {
                continue;
            }
            for mx in 0..mask_w {
                let px = x + mx as i32;
                if px < 0 || px >= w {
                    continue;
                }
                let coverage = mask[my * mask_w + mx];
                if coverage == 0 {
                    continue;
                }
                let idx = py as usize * self.width as usize + px as usize;
                blend(&mut self.px[idx], color, coverage as f32 / 255.0);
            }
        }
    }

    /// Quantize to a packed RGB8 raster.
    pub fn to_rgb8(&self, provenance: Provenance) -> Result<RasterImage> {
        let data = self
            .px
            .iter()
            .flat_map(|p| [unit_to_u8(p[0]), unit_to_u8(p[1]), unit_to_u8(p[2])])
            .collect();
        RasterImage::from_raw(self.width, self.height, ChannelLayout::Rgb8, data, provenance)
    }
}

/// Color of a linear gradient at offset `t`.
pub fn sample_gradient(stops: &[(f32, Color)], t: f32) -> Color {
    let Some(&(first_t, first)) = stops.first() else {
        return Color::TRANSPARENT;
    };
    if t <= first_t {
        return first;
    }
    for pair in stops.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let span = t1 - t0;
            return if span <= 0.0 {
                c1
            } else {
                c0.lerp(c1, (t - t0) / span)
            };
        }
    }
    stops[stops.len() - 1].1
}

#[inline]
fn blend(px: &mut [f32; 3], color: Color, coverage: f32) {
    let a = (color.a * coverage).clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    px[0] += (color.r - px[0]) * a;
    px[1] += (color.g - px[1]) * a;
    px[2] += (color.b - px[2]) * a;
}

/// Fraction of pixel `[p, p + 1)` inside `[lo, hi)`.
#[inline]
fn span_coverage(p: u32, lo: f32, hi: f32) -> f32 {
    let p = p as f32;
    ((p + 1.0).min(hi) - p.max(lo)).clamp(0.0, 1.0)
}

/// `[lo, hi)` indicator convolved with a Gaussian, evaluated at `t`.
#[inline]
fn blurred_span(t: f32, lo: f32, hi: f32, sigma: f32) -> f32 {
    let k = 1.0 / (sigma * std::f32::consts::SQRT_2);
    (0.5 * (erf((t - lo) * k) - erf((t - hi) * k))).clamp(0.0, 1.0)
}

/// Abramowitz-Stegun 7.1.26, absolute error below 1.5e-7.
fn erf(x: f32) -> f32 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = ((((1.061_405_4 * t - 1.453_152_1) * t + 1.421_413_8) * t - 0.284_496_74) * t
        + 0.254_829_6)
        * t;
    sign * (1.0 - poly * (-x * x).exp())
}

fn sample_bilinear(image: &RasterImage, x: f32, y: f32) -> Color {
    let (w, h) = image.dimensions();
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let at = |x: u32, y: u32| {
        let [r, g, b, a] = image.pixel_rgba(x, y);
        Color::from_rgba8(r, g, b, a)
    };
    let top = at(x0, y0).lerp(at(x1, y0), fx);
    let bottom = at(x0, y1).lerp(at(x1, y1), fx);
    top.lerp(bottom, fy)
}
