//! Capsule AI - detection, narrative and batch orchestration
//!
//! Provides:
//! - The `Detector` seam for apparel-like region labelling
//! - The `NarrativeBuilder` seam mapping labels to a caption
//! - `Enhancer`, which runs enhance → detect → narrate per image and
//!   commits whole batches atomically

pub mod batch;
pub mod detection;
pub mod error;
pub mod narrative;

pub use batch::{Batch, Enhancer, SourceImage};
pub use detection::{Detector, NullDetector, ToneDetector};
pub use error::{DetectionError, DetectionResult};
pub use narrative::{NarrativeBuilder, TemplateNarrator};
