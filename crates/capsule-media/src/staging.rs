//! Staging files into engine storage with guaranteed cleanup.

use crate::engine::EncodingEngine;
use crate::error::EncodeResult;
use std::sync::Arc;
use tracing::{debug, warn};

/// printf-style pattern matching `frame_file_name`.
pub const FRAME_PATTERN: &str = "frame_%04d.png";

/// Name the encoder writes the capsule to inside engine storage.
pub const OUTPUT_FILE_NAME: &str = "capsule.mp4";

/// Staged name of frame `index`: `frame_0000.png`, `frame_0001.png`, ...
pub fn frame_file_name(index: u32) -> String {
    format!("frame_{index:04}.png")
}

/// Tracks every file placed into engine storage for one job and unlinks
/// them all when dropped, whichever way the job ends.
pub struct StagingGuard {
    engine: Arc<dyn EncodingEngine>,
    staged: Vec<String>,
    outputs: Vec<String>,
}

impl StagingGuard {
    pub fn new(engine: Arc<dyn EncodingEngine>) -> Self {
        Self {
            engine,
            staged: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Write a file and track it for cleanup.
    pub fn stage(&mut self, name: &str, data: &[u8]) -> EncodeResult<()> {
        self.engine.write_file(name, data)?;
        self.staged.push(name.to_string());
        Ok(())
    }

    /// Track a file the engine is expected to create, such as the encode
    /// output. It may never appear if the job fails.
    pub fn track_output(&mut self, name: &str) {
        self.outputs.push(name.to_string());
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        let staged = self.staged.len();
        for name in self.staged.drain(..) {
            if let Err(e) = self.engine.unlink(&name) {
                warn!(file = %name, error = %e, "Failed to unlink staged file");
            }
        }
        for name in self.outputs.drain(..) {
            if let Err(e) = self.engine.unlink(&name) {
                debug!(file = %name, error = %e, "Output not removed");
            }
        }
        debug!(engine = self.engine.name(), staged, "Staging released");
    }
}
