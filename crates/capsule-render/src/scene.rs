//! The capsule scene: a slowly zooming photo over a dark gradient, a caption
//! panel, a status label that changes over time and a pulsing badge.
//!
//! Every layer is a pure function of the frame index, so frames can be
//! rendered in any order and in parallel.

use crate::canvas::Canvas;
use crate::text::{CaptionFont, TextStamp};
use capsule_core::capsule::{HEIGHT, TOTAL_FRAMES, WIDTH};
use capsule_core::{CapsuleError, Color, EnhancedImage, RasterImage, Rect, Result, SharedRaster};
use rayon::prelude::*;
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

pub const TITLE: &str = "Look & Feel";
pub const HANDLE: &str = "@studio-ugc";
pub const BADGE_LABEL: &str = "UGC Mood";

const W: f32 = WIDTH as f32;
const H: f32 = HEIGHT as f32;

const BACKDROP: [(f32, Color); 3] = [
    (0.0, Color::new(15.0 / 255.0, 23.0 / 255.0, 42.0 / 255.0, 0.95)),
    (0.45, Color::new(15.0 / 255.0, 23.0 / 255.0, 42.0 / 255.0, 0.65)),
    (1.0, Color::new(15.0 / 255.0, 23.0 / 255.0, 42.0 / 255.0, 0.95)),
];
const SHADOW: Color = Color::new(15.0 / 255.0, 15.0 / 255.0, 15.0 / 255.0, 0.35);
const SHADOW_BLUR: f32 = 35.0;
const PANEL: Color = Color::new(15.0 / 255.0, 23.0 / 255.0, 42.0 / 255.0, 0.55);
const TITLE_COLOR: Color = Color::rgb(199.0 / 255.0, 210.0 / 255.0, 254.0 / 255.0);
const LINE_COLOR: Color = Color::rgb(226.0 / 255.0, 232.0 / 255.0, 240.0 / 255.0);
const STATUS_COLOR: Color = Color::rgb(168.0 / 255.0, 85.0 / 255.0, 247.0 / 255.0);
const HANDLE_COLOR: Color = Color::new(226.0 / 255.0, 232.0 / 255.0, 240.0 / 255.0, 0.65);
const BADGE_COLOR: Color = Color::rgb(79.0 / 255.0, 70.0 / 255.0, 229.0 / 255.0);
const BADGE_TEXT_COLOR: Color = Color::rgb(248.0 / 255.0, 250.0 / 255.0, 252.0 / 255.0);

const TEXT_X: f32 = 64.0;
const LINE_SPACING: f32 = 36.0;

/// Fraction of the clip elapsed at frame `index`.
#[inline]
pub fn progress_for(index: u32) -> f32 {
    index as f32 / TOTAL_FRAMES as f32
}

/// Ken Burns zoom factor at frame `index`: 1.05 rising linearly by 0.08
/// over the clip.
#[inline]
pub fn zoom_for(index: u32) -> f32 {
    1.05 + progress_for(index) * 0.08
}

/// Badge breathing value at frame `index`, one full sine period per clip.
#[inline]
pub fn badge_pulse(index: u32) -> f32 {
    0.2 + (progress_for(index) * std::f32::consts::TAU).sin() * 0.2
}

/// The label shown under the caption, by thirds of the clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLabel {
    Style,
    Comfort,
    Attitude,
}

impl StatusLabel {
    pub const ALL: [Self; 3] = [Self::Style, Self::Comfort, Self::Attitude];

    pub fn for_frame(index: u32) -> Self {
        let p = progress_for(index);
        if p < 0.33 {
            Self::Style
        } else if p < 0.66 {
            Self::Comfort
        } else {
            Self::Attitude
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Self::Style => "Style",
            Self::Comfort => "Comfort",
            Self::Attitude => "Attitude",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Where the photo lands at frame `index` for a source of the given size.
///
/// Width fills 86% of the canvas before zoom; the zoom grows the photo about
/// its horizontal center while its top edge is anchored near 15% height.
pub fn image_rect(source_w: u32, source_h: u32, index: u32) -> Rect {
    let zoom = zoom_for(index);
    let aspect = source_w as f32 / source_h as f32;
    let target_w = W * 0.86;
    let target_h = target_w / aspect;
    let final_w = target_w * zoom;
    let final_h = target_h * zoom;
    Rect::new(
        (W - final_w) / 2.0,
        H * 0.15 - (final_h - target_h) / 2.0,
        final_w,
        final_h,
    )
}

/// Badge bounds.
pub const BADGE_RECT: Rect = Rect::new(W - 200.0, 92.0, 120.0, 36.0);
const BADGE_RADIUS: f32 = 18.0;

/// One synthesized frame, packed RGB8 at the capsule resolution.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u32,
    pub raster: RasterImage,
}

impl Frame {
    pub fn to_png(&self) -> Result<Vec<u8>> {
        self.raster.to_png()
    }
}

/// Caption text rasterized once per render.
#[derive(Debug, Clone)]
struct CaptionLayers {
    title: TextStamp,
    lines: Vec<TextStamp>,
    status: [TextStamp; 3],
    handle: TextStamp,
    badge: TextStamp,
}

impl CaptionLayers {
    fn build(font: &CaptionFont, lines: &[String]) -> Self {
        Self {
            title: font.stamp(TITLE, 28.0, TEXT_X, H * 0.65),
            lines: lines
                .iter()
                .enumerate()
                .map(|(i, line)| font.stamp(line, 26.0, TEXT_X, H * 0.69 + i as f32 * LINE_SPACING))
                .collect(),
            status: StatusLabel::ALL.map(|s| font.stamp(s.text(), 22.0, TEXT_X, H * 0.9)),
            handle: font.stamp(HANDLE, 20.0, TEXT_X, H * 0.935),
            badge: font.stamp(BADGE_LABEL, 18.0, W - 182.0, 118.0),
        }
    }
}

/// Renders frames of the capsule for one enhanced image.
#[derive(Debug, Clone)]
pub struct FrameSynthesizer {
    source: SharedRaster,
    lines: Vec<String>,
    caption: Option<Arc<CaptionLayers>>,
}

impl FrameSynthesizer {
    /// Prepare a scene. Without a font the text layers are skipped.
    pub fn new(image: &EnhancedImage, font: Option<&CaptionFont>) -> Result<Self> {
        let (w, h) = image.raster.dimensions();
        if w == 0 || h == 0 {
            return Err(CapsuleError::RenderTarget(format!(
                "cannot compose an empty {w}x{h} image"
            )));
        }
        let source = if image.raster.layout() == capsule_core::ChannelLayout::Rgba8 {
            Arc::clone(&image.raster)
        } else {
            Arc::new(image.raster.as_ref().clone().into_rgba8())
        };
        let lines: Vec<String> = image.narrative_lines().into_iter().map(String::from).collect();
        let caption = font.map(|f| Arc::new(CaptionLayers::build(f, &lines)));
        debug!(
            source = %image.source.name,
            lines = lines.len(),
            captions = caption.is_some(),
            "Scene prepared"
        );
        Ok(Self {
            source,
            lines,
            caption,
        })
    }

    /// Trimmed, non-empty caption lines in display order.
    pub fn narrative_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn has_captions(&self) -> bool {
        self.caption.is_some()
    }

    /// Render frame `index` in `[0, TOTAL_FRAMES)`.
    pub fn render_frame(&self, index: u32) -> Result<Frame> {
        if index >= TOTAL_FRAMES {
            return Err(CapsuleError::InvalidFrameIndex {
                index,
                max: TOTAL_FRAMES - 1,
            });
        }

        let mut canvas = Canvas::new(WIDTH, HEIGHT)?;
        canvas.fill_vertical_gradient(&BACKDROP);

        let photo = image_rect(self.source.width(), self.source.height(), index);
        canvas.drop_shadow(photo, SHADOW_BLUR, SHADOW);
        canvas.draw_image(&self.source, photo)?;

        canvas.fill_rect(Rect::new(48.0, H * 0.62, W - 96.0, H * 0.26), PANEL);

        if let Some(caption) = &self.caption {
            stamp(&mut canvas, &caption.title, TITLE_COLOR);
            for line in &caption.lines {
                stamp(&mut canvas, line, LINE_COLOR);
            }
            let status = StatusLabel::for_frame(index);
            stamp(&mut canvas, &caption.status[status.slot()], STATUS_COLOR);
            stamp(&mut canvas, &caption.handle, HANDLE_COLOR);
        }

        canvas.fill_rounded_rect(
            BADGE_RECT,
            BADGE_RADIUS,
            BADGE_COLOR.with_alpha(badge_pulse(index) * 0.35),
        );
        if let Some(caption) = &self.caption {
            stamp(&mut canvas, &caption.badge, BADGE_TEXT_COLOR);
        }

        let provenance = self.source.provenance().derived(format!("frame {index}"));
        let raster = canvas.to_rgb8(provenance)?;
        Ok(Frame { index, raster })
    }

    /// Render a contiguous range of frames in parallel, returned in index
    /// order.
    pub fn render_range(&self, range: Range<u32>) -> Result<Vec<Frame>> {
        range
            .into_par_iter()
            .map(|i| self.render_frame(i))
            .collect()
    }
}

fn stamp(canvas: &mut Canvas, text: &TextStamp, color: Color) {
    if !text.is_empty() {
        canvas.fill_mask(text.x, text.y, text.width, text.height, &text.coverage, color);
    }
}
