//! Caption text rasterization.
//!
//! Text is laid out once per render into `TextStamp` coverage masks; frames
//! then only blend masks, so frame rendering never touches the font.

use capsule_core::{CapsuleError, Result};
use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use fontdue::{Font, FontSettings};
use std::path::Path;
use tracing::{debug, warn};

/// Sans-serif fonts tried when no caption font is configured.
pub const FONT_SEARCH_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/inter/Inter-Regular.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// A parsed caption font.
pub struct CaptionFont {
    font: Font,
    source: String,
}

impl std::fmt::Debug for CaptionFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionFont")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl CaptionFont {
    /// Parse a TrueType/OpenType font from memory.
    pub fn from_bytes(bytes: Vec<u8>, source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| CapsuleError::Config(format!("failed to parse font {source}: {e}")))?;
        Ok(Self { font, source })
    }

    /// Read and parse a font file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes, path.display().to_string())
    }

    /// Load `preferred` if given, else the first usable entry of
    /// `FONT_SEARCH_PATHS`. Returns `None` when nothing loads; captions are
    /// then skipped.
    pub fn discover(preferred: Option<&Path>) -> Option<Self> {
        if let Some(path) = preferred {
            match Self::load(path) {
                Ok(font) => return Some(font),
                Err(e) => warn!(path = %path.display(), error = %e, "Configured font unusable"),
            }
        }
        let found = FONT_SEARCH_PATHS
            .iter()
            .map(Path::new)
            .filter(|p| p.is_file())
            .find_map(|p| Self::load(p).ok());
        match &found {
            Some(font) => debug!(source = %font.source, "Caption font loaded"),
            None => warn!("No caption font found, frames will render without text"),
        }
        found
    }

    /// Where the font was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Rasterize one line of text at `px` pixels with its alphabetic
    /// baseline starting at `(x, baseline)`.
    pub fn stamp(&self, text: &str, px: f32, x: f32, baseline: f32) -> TextStamp {
        let ascent = self
            .font
            .horizontal_line_metrics(px)
            .map(|m| m.ascent)
            .unwrap_or(px * 0.8);

        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x,
            y: baseline - ascent,
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &TextStyle::new(text, px, 0));

        let glyphs: Vec<_> = layout
            .glyphs()
            .iter()
            .filter(|g| g.width > 0 && g.height > 0)
            .map(|g| {
                let (_, bitmap) = self.font.rasterize_config(g.key);
                (g.x.round() as i32, g.y.round() as i32, g.width, g.height, bitmap)
            })
            .collect();

        let Some(left) = glyphs.iter().map(|g| g.0).min() else {
            return TextStamp::default();
        };
        let top = glyphs.iter().map(|g| g.1).min().unwrap_or(0);
        let right = glyphs.iter().map(|g| g.0 + g.2 as i32).max().unwrap_or(left);
        let bottom = glyphs.iter().map(|g| g.1 + g.3 as i32).max().unwrap_or(top);

        let width = (right - left) as usize;
        let height = (bottom - top) as usize;
        let mut coverage = vec![0u8; width * height];
        for (gx, gy, gw, gh, bitmap) in &glyphs {
            let ox = (gx - left) as usize;
            let oy = (gy - top) as usize;
            for row in 0..*gh {
                for col in 0..*gw {
                    let dst = &mut coverage[(oy + row) * width + ox + col];
                    *dst = (*dst).max(bitmap[row * gw + col]);
                }
            }
        }

        TextStamp {
            x: left,
            y: top,
            width,
            height,
            coverage,
        }
    }
}

/// A pre-rasterized line of text: an 8-bit coverage mask and its canvas
/// position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextStamp {
    pub x: i32,
    pub y: i32,
    pub width: usize,
    pub height: usize,
    pub coverage: Vec<u8>,
}

impl TextStamp {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
