//! The enhancement pipeline: resample → tone → denoise → warmth.
//!
//! Order matters and is fixed. Each stage is skipped when its parameter is
//! neutral, so neutral settings reduce to a pure resample.

use crate::blur::gaussian_blur;
use crate::resample::resample_bicubic;
use crate::tone::ToneAdjust;
use crate::warmth::apply_warmth;
use capsule_core::{ChannelLayout, EnhancementSettings, RasterImage, Result};
use tracing::debug;

/// Enhance a decoded image. Pure; only allocates the output buffer.
pub fn enhance(image: &RasterImage, settings: &EnhancementSettings) -> Result<RasterImage> {
    let (w, h) = image.dimensions();
    let (out_w, out_h) = settings.upscale().scaled(w, h);
    debug!(
        source = %image.provenance().name,
        from = ?(w, h),
        to = ?(out_w, out_h),
        "Enhancing image"
    );

    // Output is always opaque: transparent regions become black.
    let flattened;
    let source = if image.layout() == ChannelLayout::Rgba8 && image.is_opaque() {
        image
    } else {
        flattened = image.clone().into_opaque();
        &flattened
    };

    let mut output = resample_bicubic(source, out_w, out_h)?;

    ToneAdjust::from_settings(settings).apply(&mut output);

    if settings.denoise() > 0.0 {
        gaussian_blur(&mut output, settings.blur_sigma())?;
    }

    apply_warmth(&mut output, settings.warmth());

    Ok(output)
}

/// Decode encoded bytes, then enhance.
pub fn enhance_bytes(
    bytes: &[u8],
    name: &str,
    settings: &EnhancementSettings,
) -> Result<RasterImage> {
    let decoded = RasterImage::decode(bytes, name)?;
    enhance(&decoded, settings)
}
