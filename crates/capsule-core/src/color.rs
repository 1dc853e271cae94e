//! Color types and blend formulas.
//!
//! Blend modes are expressed as plain alpha-compositing formulas on
//! normalized channels so any rasterizer reproduces them exactly.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// RGBA color with 32-bit float components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Create a new color from RGBA components.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from RGB with alpha = 1.0.
    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a color from 8-bit RGB and a float alpha, like CSS `rgba()`.
    #[inline]
    pub fn from_rgb8_alpha(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a,
        }
    }

    /// Create a color from 8-bit RGBA values.
    #[inline]
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::from_rgb8_alpha(r, g, b, a as f32 / 255.0)
    }

    /// Convert to 8-bit RGBA, rounding to nearest.
    #[inline]
    pub fn to_rgba8(self) -> [u8; 4] {
        [
            unit_to_u8(self.r),
            unit_to_u8(self.g),
            unit_to_u8(self.b),
            unit_to_u8(self.a),
        ]
    }

    /// Same color with a different alpha.
    #[inline]
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Linear interpolation between two colors.
    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
}

/// Convert a normalized channel to 8-bit with rounding.
#[inline]
pub fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Blend mode for compositing a layer over a base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// Source-over.
    #[default]
    Normal,
    /// `1 - (1 - a)(1 - b)`
    Screen,
    /// `a * b`
    Multiply,
}

impl BlendMode {
    /// Blend a single normalized channel of `layer` onto `base`.
    #[inline]
    pub fn blend_channel(self, base: f32, layer: f32) -> f32 {
        match self {
            Self::Normal => layer,
            Self::Screen => 1.0 - (1.0 - base) * (1.0 - layer),
            Self::Multiply => base * layer,
        }
    }

    /// Composite `layer` onto one 8-bit RGB(A) pixel with the given opacity.
    ///
    /// The destination alpha channel, if any, is left untouched.
    #[inline]
    pub fn composite_px(self, px: &mut [u8], layer: Color, opacity: f32) {
        let alpha = (layer.a * opacity).clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let src = [layer.r, layer.g, layer.b];
        for (c, s) in px.iter_mut().take(3).zip(src) {
            let base = *c as f32 / 255.0;
            let blended = self.blend_channel(base, s);
            *c = unit_to_u8(base + (blended - base) * alpha);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_rgba8_conversion() {
        let color = Color::from_rgba8(255, 128, 0, 255);
        assert!((color.r - 1.0).abs() < 0.01);
        assert!((color.g - 0.5).abs() < 0.01);
        assert_eq!(color.b, 0.0);
        assert_eq!(color.to_rgba8(), [255, 128, 0, 255]);
    }

    #[test]
    fn test_screen_formula() {
        let v = BlendMode::Screen.blend_channel(0.5, 0.5);
        assert!((v - 0.75).abs() < 1e-6);
        // Screen never darkens.
        assert!(BlendMode::Screen.blend_channel(0.3, 0.0) >= 0.3);
    }

    #[test]
    fn test_multiply_formula() {
        let v = BlendMode::Multiply.blend_channel(0.5, 0.5);
        assert!((v - 0.25).abs() < 1e-6);
        assert_eq!(BlendMode::Multiply.blend_channel(0.7, 1.0), 0.7);
    }

    #[test]
    fn test_composite_zero_opacity_is_noop() {
        let mut px = [12u8, 34, 56, 255];
        BlendMode::Screen.composite_px(&mut px, Color::WHITE, 0.0);
        assert_eq!(px, [12, 34, 56, 255]);
    }

    #[test]
    fn test_composite_normal_full_opacity_replaces() {
        let mut px = [0u8, 0, 0];
        BlendMode::Normal.composite_px(&mut px, Color::from_rgba8(10, 20, 30, 255), 1.0);
        assert_eq!(px, [10, 20, 30]);
    }
}
