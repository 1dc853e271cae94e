//! Capsule Render - frame synthesis for the vertical capsule video
//!
//! Provides:
//! - `Canvas`, an opaque float surface with the drawing primitives the
//!   scene needs (gradients, rects, rounded rects, drop shadows, images)
//! - `CaptionFont` / `TextStamp` for pre-rasterized caption text
//! - `FrameSynthesizer`, which renders frame `i` of the capsule

pub mod canvas;
pub mod scene;
pub mod text;

pub use canvas::Canvas;
pub use scene::{badge_pulse, zoom_for, Frame, FrameSynthesizer, StatusLabel};
pub use text::{CaptionFont, TextStamp};
