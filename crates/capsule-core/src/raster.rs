//! Raster buffers for decoded pixel data in CPU memory.
//!
//! A `RasterImage` is produced once per input and never mutated after it
//! has been handed to a later stage; stages share it through `SharedRaster`.

use crate::error::{CapsuleError, Result};
use image::ImageEncoder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Channel layout of a raster buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChannelLayout {
    /// 8-bit RGBA (32 bits per pixel)
    #[default]
    Rgba8,
    /// 8-bit RGB (24 bits per pixel)
    Rgb8,
    /// 8-bit grayscale
    Gray8,
}

impl ChannelLayout {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Rgb8 => 3,
            Self::Gray8 => 1,
        }
    }

    /// Calculate total bytes needed for a buffer of this layout.
    pub fn buffer_size(self, width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(self.bytes_per_pixel())
    }

    fn extended_color_type(self) -> image::ExtendedColorType {
        match self {
            Self::Rgba8 => image::ExtendedColorType::Rgba8,
            Self::Rgb8 => image::ExtendedColorType::Rgb8,
            Self::Gray8 => image::ExtendedColorType::L8,
        }
    }
}

/// Where a raster came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Stable identity of the source input.
    pub source_id: Uuid,
    /// Display name of the source (usually its file name).
    pub name: String,
    /// Length of the encoded source in bytes.
    pub byte_len: usize,
}

impl Provenance {
    /// Provenance for a freshly ingested input.
    pub fn new(name: impl Into<String>, byte_len: usize) -> Self {
        Self {
            source_id: Uuid::new_v4(),
            name: name.into(),
            byte_len,
        }
    }

    /// Provenance for a raster synthesized in memory.
    pub fn synthetic(name: impl Into<String>) -> Self {
        Self::new(name, 0)
    }

    /// Provenance for a raster computed from this source. Keeps the source
    /// identity, so deriving twice yields equal records.
    pub fn derived(&self, name: impl Into<String>) -> Self {
        Self {
            source_id: self.source_id,
            name: name.into(),
            byte_len: 0,
        }
    }
}

/// An owned, tightly packed pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    layout: ChannelLayout,
    width: u32,
    height: u32,
    data: Vec<u8>,
    provenance: Provenance,
}

/// Arc-wrapped raster for shared read-only access.
pub type SharedRaster = Arc<RasterImage>;

impl RasterImage {
    /// Allocate a zeroed raster.
    ///
    /// Fails with `RenderTarget` when the dimensions are empty or the buffer
    /// cannot be allocated.
    pub fn new(width: u32, height: u32, layout: ChannelLayout, provenance: Provenance) -> Result<Self> {
        let len = checked_len(width, height, layout)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            CapsuleError::RenderTarget(format!("cannot allocate {width}x{height} buffer: {e}"))
        })?;
        data.resize(len, 0);
        Ok(Self {
            layout,
            width,
            height,
            data,
            provenance,
        })
    }

    /// Wrap an existing packed buffer.
    pub fn from_raw(
        width: u32,
        height: u32,
        layout: ChannelLayout,
        data: Vec<u8>,
        provenance: Provenance,
    ) -> Result<Self> {
        let len = checked_len(width, height, layout)?;
        if data.len() != len {
            return Err(CapsuleError::RenderTarget(format!(
                "buffer of {} bytes does not match {width}x{height} {layout:?}",
                data.len()
            )));
        }
        Ok(Self {
            layout,
            width,
            height,
            data,
            provenance,
        })
    }

    /// A raster filled with a single RGBA color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4], provenance: Provenance) -> Result<Self> {
        let mut raster = Self::new(width, height, ChannelLayout::Rgba8, provenance)?;
        for px in raster.data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
        Ok(raster)
    }

    /// Decode encoded image bytes (PNG, JPEG, WebP) into an RGBA8 raster.
    pub fn decode(bytes: &[u8], name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| CapsuleError::Decode(format!("{name}: {e}")))?
            .into_rgba8();
        let (width, height) = decoded.dimensions();
        Self::from_raw(
            width,
            height,
            ChannelLayout::Rgba8,
            decoded.into_raw(),
            Provenance::new(name, bytes.len()),
        )
    }

    /// Encode as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        image::codecs::png::PngEncoder::new(&mut out)
            .write_image(
                &self.data,
                self.width,
                self.height,
                self.layout.extended_color_type(),
            )
            .map_err(|e| CapsuleError::RenderTarget(format!("PNG encode failed: {e}")))?;
        Ok(out)
    }

    /// Convert to RGBA8, returning `self` unchanged when already RGBA8.
    pub fn into_rgba8(self) -> Self {
        let data = match self.layout {
            ChannelLayout::Rgba8 => return self,
            ChannelLayout::Rgb8 => self
                .data
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            ChannelLayout::Gray8 => self.data.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        };
        Self {
            layout: ChannelLayout::Rgba8,
            data,
            ..self
        }
    }

    /// True when every pixel is fully opaque.
    pub fn is_opaque(&self) -> bool {
        match self.layout {
            ChannelLayout::Rgba8 => self.data.chunks_exact(4).all(|p| p[3] == 255),
            ChannelLayout::Rgb8 | ChannelLayout::Gray8 => true,
        }
    }

    /// Composite over opaque black into RGBA8 with alpha 255 everywhere.
    pub fn into_opaque(self) -> Self {
        let mut raster = self.into_rgba8();
        for px in raster.data.chunks_exact_mut(4) {
            let a = px[3] as u16;
            for c in &mut px[..3] {
                *c = ((*c as u16 * a + 127) / 255) as u8;
            }
            px[3] = 255;
        }
        raster
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Raw packed pixel data.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Raw packed pixel data, mutably. Only stages that own the raster
    /// before it is shared should write through this.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width as usize * self.layout.bytes_per_pixel()
    }

    /// Get a row of pixel data.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    /// Get a mutable row of pixel data.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// Pixel at `(x, y)` widened to RGBA.
    pub fn pixel_rgba(&self, x: u32, y: u32) -> [u8; 4] {
        let bpp = self.layout.bytes_per_pixel();
        let i = (y as usize * self.width as usize + x as usize) * bpp;
        let p = &self.data[i..i + bpp];
        match self.layout {
            ChannelLayout::Rgba8 => [p[0], p[1], p[2], p[3]],
            ChannelLayout::Rgb8 => [p[0], p[1], p[2], 255],
            ChannelLayout::Gray8 => [p[0], p[0], p[0], 255],
        }
    }
}

fn checked_len(width: u32, height: u32, layout: ChannelLayout) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(CapsuleError::RenderTarget(format!(
            "empty render target {width}x{height}"
        )));
    }
    layout.buffer_size(width, height).ok_or_else(|| {
        CapsuleError::RenderTarget(format!("render target {width}x{height} overflows"))
    })
}
