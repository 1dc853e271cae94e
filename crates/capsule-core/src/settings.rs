//! Enhancement settings shared by every image of a batch.

use crate::error::{CapsuleError, Result};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Integer upscale factor applied before color work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum UpscaleFactor {
    /// Keep the original resolution.
    X1,
    #[default]
    X2,
    X4,
}

impl UpscaleFactor {
    /// Numeric factor.
    pub fn factor(self) -> u32 {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
        }
    }

    /// Output dimensions for a source of `width`x`height`.
    pub fn scaled(self, width: u32, height: u32) -> (u32, u32) {
        let f = self.factor() as f64;
        (
            (width as f64 * f).round() as u32,
            (height as f64 * f).round() as u32,
        )
    }
}

impl TryFrom<u32> for UpscaleFactor {
    type Error = CapsuleError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(Self::X1),
            2 => Ok(Self::X2),
            4 => Ok(Self::X4),
            other => Err(CapsuleError::InvalidSettings(format!(
                "upscale factor must be 1, 2 or 4, got {other}"
            ))),
        }
    }
}

impl From<UpscaleFactor> for u32 {
    fn from(value: UpscaleFactor) -> Self {
        value.factor()
    }
}

/// Immutable enhancement parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSettings", into = "RawSettings")]
pub struct EnhancementSettings {
    upscale: UpscaleFactor,
    denoise: f32,
    brightness: f32,
    saturation: f32,
    warmth: f32,
}

impl EnhancementSettings {
    pub const DENOISE_RANGE: RangeInclusive<f32> = 0.0..=0.4;
    pub const BRIGHTNESS_RANGE: RangeInclusive<f32> = 0.9..=1.2;
    pub const SATURATION_RANGE: RangeInclusive<f32> = 0.9..=1.3;
    pub const WARMTH_RANGE: RangeInclusive<f32> = -0.3..=0.3;

    /// Validate and build a settings value.
    pub fn new(
        upscale: UpscaleFactor,
        denoise: f32,
        brightness: f32,
        saturation: f32,
        warmth: f32,
    ) -> Result<Self> {
        check("denoise", denoise, Self::DENOISE_RANGE)?;
        check("brightness", brightness, Self::BRIGHTNESS_RANGE)?;
        check("saturation", saturation, Self::SATURATION_RANGE)?;
        check("warmth", warmth, Self::WARMTH_RANGE)?;
        Ok(Self {
            upscale,
            denoise,
            brightness,
            saturation,
            warmth,
        })
    }

    /// Settings that leave color untouched and only resample.
    pub fn neutral(upscale: UpscaleFactor) -> Self {
        Self {
            upscale,
            denoise: 0.0,
            brightness: 1.0,
            saturation: 1.0,
            warmth: 0.0,
        }
    }

    #[inline]
    pub fn upscale(&self) -> UpscaleFactor {
        self.upscale
    }

    #[inline]
    pub fn denoise(&self) -> f32 {
        self.denoise
    }

    #[inline]
    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    #[inline]
    pub fn saturation(&self) -> f32 {
        self.saturation
    }

    #[inline]
    pub fn warmth(&self) -> f32 {
        self.warmth
    }

    /// Contrast boost coupled to denoise.
    #[inline]
    pub fn contrast(&self) -> f32 {
        1.0 + self.denoise * 0.12
    }

    /// Gaussian blur standard deviation in output pixels, zero when denoise is off.
    #[inline]
    pub fn blur_sigma(&self) -> f32 {
        self.denoise * 1.6
    }
}

impl Default for EnhancementSettings {
    fn default() -> Self {
        Self {
            upscale: UpscaleFactor::X2,
            denoise: 0.15,
            brightness: 1.06,
            saturation: 1.12,
            warmth: 0.12,
        }
    }
}

fn check(name: &str, value: f32, range: RangeInclusive<f32>) -> Result<()> {
    if value.is_finite() && range.contains(&value) {
        Ok(())
    } else {
        Err(CapsuleError::InvalidSettings(format!(
            "{name} must be within {}..={}, got {value}",
            range.start(),
            range.end()
        )))
    }
}

/// Wire form used for (de)serialization so validation always runs.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    upscale_factor: UpscaleFactor,
    denoise: f32,
    brightness: f32,
    saturation: f32,
    warmth: f32,
}

impl TryFrom<RawSettings> for EnhancementSettings {
    type Error = CapsuleError;

    fn try_from(raw: RawSettings) -> Result<Self> {
        Self::new(
            raw.upscale_factor,
            raw.denoise,
            raw.brightness,
            raw.saturation,
            raw.warmth,
        )
    }
}

impl From<EnhancementSettings> for RawSettings {
    fn from(s: EnhancementSettings) -> Self {
        Self {
            upscale_factor: s.upscale,
            denoise: s.denoise,
            brightness: s.brightness,
            saturation: s.saturation,
            warmth: s.warmth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let d = EnhancementSettings::default();
        let rebuilt = EnhancementSettings::new(
            d.upscale(),
            d.denoise(),
            d.brightness(),
            d.saturation(),
            d.warmth(),
        )
        .unwrap();
        assert_eq!(d, rebuilt);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(EnhancementSettings::new(UpscaleFactor::X1, 0.5, 1.0, 1.0, 0.0).is_err());
        assert!(EnhancementSettings::new(UpscaleFactor::X1, 0.0, 1.0, 1.0, -0.31).is_err());
        assert!(EnhancementSettings::new(UpscaleFactor::X1, f32::NAN, 1.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_upscale_factor_parsing() {
        assert_eq!(UpscaleFactor::try_from(4).unwrap(), UpscaleFactor::X4);
        assert!(UpscaleFactor::try_from(3).is_err());
        assert_eq!(UpscaleFactor::X2.scaled(100, 37), (200, 74));
    }

    #[test]
    fn test_derived_parameters() {
        let s = EnhancementSettings::new(UpscaleFactor::X1, 0.25, 1.0, 1.0, -0.3).unwrap();
        assert!((s.contrast() - 1.03).abs() < 1e-6);
        assert!((s.blur_sigma() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_json_validation() {
        let ok = r#"{"upscaleFactor":4,"denoise":0.1,"brightness":1.0,"saturation":1.0,"warmth":0.0}"#;
        let parsed: EnhancementSettings = serde_json::from_str(ok).unwrap();
        assert_eq!(parsed.upscale(), UpscaleFactor::X4);

        let bad = r#"{"upscaleFactor":3,"denoise":0.1,"brightness":1.0,"saturation":1.0,"warmth":0.0}"#;
        assert!(serde_json::from_str::<EnhancementSettings>(bad).is_err());
    }
}
