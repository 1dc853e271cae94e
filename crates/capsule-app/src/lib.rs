//! Capsule App - session wiring and the capsule video composer
//!
//! Ties the enhancement batch, the render-source selection and the video
//! state machine together behind one `Session`.

pub mod composer;
pub mod config;
pub mod session;
pub mod state;

pub use composer::{ComposerOptions, VideoComposer};
pub use config::{CapsuleConfig, DetectorKind};
pub use session::Session;
pub use state::{RenderEvent, VideoArtifact, VideoRenderState};
