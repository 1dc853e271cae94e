//! Apparel detection adapter.
//!
//! The real detector is an external model; this module defines the seam and
//! two local implementations: one that never finds anything and a
//! deterministic color-statistics heuristic usable without a model.

use crate::error::DetectionResult;
use capsule_core::RasterImage;

/// Labels apparel-like regions of an enhanced image.
pub trait Detector: Send + Sync {
    /// Detector name for logs.
    fn name(&self) -> &str;

    /// Detect labels, in confidence order. May fail; callers degrade a failure
    /// to an empty list.
    fn detect(&self, image: &RasterImage) -> DetectionResult<Vec<String>>;
}

/// Detector that returns no labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDetector;

impl Detector for NullDetector {
    fn name(&self) -> &str {
        "null"
    }

    fn detect(&self, _image: &RasterImage) -> DetectionResult<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Summary statistics of the torso region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionStats {
    /// Mean normalized RGB.
    pub mean: [f32; 3],
    /// Mean luminance in `[0, 1]`.
    pub luminance: f32,
    /// Mean chroma (max - min channel) in `[0, 1]`.
    pub chroma: f32,
    /// Mean horizontal gradient magnitude in `[0, 1]`.
    pub texture: f32,
}

/// Compute statistics over the central torso window of the image
/// (middle half horizontally, 35%..85% vertically), sampled on a grid.
pub fn torso_stats(image: &RasterImage) -> Option<RegionStats> {
    let (w, h) = image.dimensions();
    let x0 = w / 4;
    let x1 = (w * 3 / 4).max(x0 + 1).min(w);
    let y0 = h * 35 / 100;
    let y1 = (h * 85 / 100).max(y0 + 1).min(h);
    let step = ((x1 - x0).max(y1 - y0) / 64).max(1) as usize;

    let mut sum = [0f64; 3];
    let mut lum = 0f64;
    let mut chroma = 0f64;
    let mut texture = 0f64;
    let mut count = 0u64;

    for y in (y0..y1).step_by(step) {
        for x in (x0..x1).step_by(step) {
            let [r, g, b, _] = image.pixel_rgba(x, y);
            let (r, g, b) = (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
            sum[0] += r;
            sum[1] += g;
            sum[2] += b;
            lum += 0.299 * r + 0.587 * g + 0.114 * b;
            chroma += r.max(g).max(b) - r.min(g).min(b);
            if x + 1 < w {
                let [nr, ng, nb, _] = image.pixel_rgba(x + 1, y);
                let next = (0.299 * nr as f64 + 0.587 * ng as f64 + 0.114 * nb as f64) / 255.0;
                texture += (next - (0.299 * r + 0.587 * g + 0.114 * b)).abs();
            }
            count += 1;
        }
    }

    if count == 0 {
        return None;
    }
    let n = count as f64;
    Some(RegionStats {
        mean: [
            (sum[0] / n) as f32,
            (sum[1] / n) as f32,
            (sum[2] / n) as f32,
        ],
        luminance: (lum / n) as f32,
        chroma: (chroma / n) as f32,
        texture: (texture / n) as f32,
    })
}

/// Heuristic detector based on the color statistics of the torso window.
#[derive(Debug, Clone, Copy)]
pub struct ToneDetector {
    /// Chroma above which the outfit counts as a bold color.
    pub bold_chroma: f32,
    /// Gradient energy above which the outfit counts as patterned.
    pub pattern_texture: f32,
}

impl Default for ToneDetector {
    fn default() -> Self {
        Self {
            bold_chroma: 0.35,
            pattern_texture: 0.08,
        }
    }
}

impl ToneDetector {
    /// Map region statistics to labels.
    pub fn classify(&self, stats: &RegionStats) -> Vec<String> {
        let mut labels = Vec::new();
        let [r, g, b] = stats.mean;

        if b > r && b > g && stats.chroma > 0.08 {
            labels.push("denim");
        } else if stats.chroma >= self.bold_chroma {
            labels.push("bold color top");
        } else if r >= g && g >= b && stats.chroma > 0.05 {
            labels.push("earth-tone layers");
        }

        if stats.luminance < 0.25 {
            labels.push("dark outfit");
        } else if stats.luminance > 0.75 {
            labels.push("light outfit");
        }

        if stats.texture >= self.pattern_texture {
            labels.push("patterned fabric");
        }

        labels.into_iter().map(String::from).collect()
    }
}

impl Detector for ToneDetector {
    fn name(&self) -> &str {
        "tone"
    }

    fn detect(&self, image: &RasterImage) -> DetectionResult<Vec<String>> {
        let stats = torso_stats(image).ok_or_else(|| {
            crate::error::DetectionError::UnsupportedInput(format!(
                "{}x{} image has no torso region",
                image.width(),
                image.height()
            ))
        })?;
        Ok(self.classify(&stats))
    }
}
