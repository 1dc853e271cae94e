//! Enhanced-image records produced by batch enhancement.

use crate::raster::{Provenance, SharedRaster};
use crate::settings::EnhancementSettings;
use crate::Result;
use serde::Serialize;

/// File name of the exported capsule video.
pub const VIDEO_FILE_NAME: &str = "ugc-video.mp4";

/// Download name of the `index`-th (0-based) enhanced image of a batch.
pub fn enhanced_file_name(index: usize) -> String {
    format!("ugc-image-enhanced-{}.png", index + 1)
}

/// One fully processed input: enhanced pixels plus detection and caption.
#[derive(Debug, Clone, Serialize)]
pub struct EnhancedImage {
    /// Identity of the input this record was produced from.
    pub source: Provenance,
    /// The enhanced pixels.
    #[serde(skip)]
    pub raster: SharedRaster,
    pub width: u32,
    pub height: u32,
    pub settings: EnhancementSettings,
    /// Detected labels in detector order; empty when detection failed.
    pub labels: Vec<String>,
    /// Newline-delimited caption.
    pub narrative: String,
}

impl EnhancedImage {
    /// Build a record around an enhanced raster.
    pub fn new(
        raster: SharedRaster,
        settings: EnhancementSettings,
        labels: Vec<String>,
        narrative: String,
    ) -> Self {
        Self {
            source: raster.provenance().clone(),
            width: raster.width(),
            height: raster.height(),
            raster,
            settings,
            labels,
            narrative,
        }
    }

    /// Narrative split into display lines, trimmed, empty lines dropped.
    pub fn narrative_lines(&self) -> Vec<&str> {
        self.narrative
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// Encoded PNG form for display or download.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        self.raster.to_png()
    }
}
