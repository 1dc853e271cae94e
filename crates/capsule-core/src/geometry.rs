//! Geometric primitives for canvas layout.

use bytemuck::{Pod, Zeroable};
use glam::Vec2 as GlamVec2;
use serde::{Deserialize, Serialize};

/// 2D vector.
pub type Vec2 = GlamVec2;

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point.
    #[inline]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Compute intersection with another rectangle.
    pub fn intersection(self, other: Self) -> Option<Self> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        if x1 < x2 && y1 < y2 {
            Some(Self::new(x1, y1, x2 - x1, y2 - y1))
        } else {
            None
        }
    }

    /// Expand the rectangle by a margin on all sides.
    pub fn expand(self, margin: f32) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            self.width + margin * 2.0,
            self.height + margin * 2.0,
        )
    }

    /// Integer pixel span `(x0, y0, x1, y1)` covered by this rectangle,
    /// clipped to a `width`x`height` surface. End bounds are exclusive.
    pub fn pixel_span(self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let clip = self.intersection(Self::new(0.0, 0.0, width as f32, height as f32))?;
        let x0 = clip.x.floor() as u32;
        let y0 = clip.y.floor() as u32;
        let x1 = ((clip.x + clip.width).ceil() as u32).min(width);
        let y1 = ((clip.y + clip.height).ceil() as u32).min(height);
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }
}
