//! Single-job encoder driver: stage frames, run, collect output, clean up.

use crate::engine::EncodingEngine;
use crate::error::{EncodeError, EncodeResult};
use crate::request::EncodeRequest;
use crate::staging::{frame_file_name, StagingGuard};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Clamps progress ratios to `[0, 1]` and drops any that would move
/// backwards.
#[derive(Debug, Default)]
pub struct MonotonicProgress {
    last: Mutex<f32>,
}

impl MonotonicProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a raw ratio. Returns the new value if it advanced.
    pub fn advance(&self, ratio: f32) -> Option<f32> {
        if !ratio.is_finite() {
            return None;
        }
        let ratio = ratio.clamp(0.0, 1.0);
        let mut last = self.last.lock();
        if ratio > *last {
            *last = ratio;
            Some(ratio)
        } else {
            None
        }
    }

    pub fn value(&self) -> f32 {
        *self.last.lock()
    }
}

/// Runs encodes on one engine, one job at a time.
pub struct EncoderDriver {
    engine: Arc<dyn EncodingEngine>,
    job: Mutex<()>,
}

impl EncoderDriver {
    pub fn new(engine: Arc<dyn EncodingEngine>) -> Self {
        Self {
            engine,
            job: Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &Arc<dyn EncodingEngine> {
        &self.engine
    }

    /// Encode PNG frames (in index order) and return the output bytes.
    ///
    /// Blocks until any in-flight job on this engine finishes. All staged
    /// frames and the output are removed from engine storage on every path.
    /// `on_progress` sees clamped, non-decreasing ratios.
    pub fn encode(
        &self,
        frames: &[Vec<u8>],
        request: &EncodeRequest,
        on_progress: &mut dyn FnMut(f32),
    ) -> EncodeResult<Vec<u8>> {
        if frames.is_empty() {
            return Err(EncodeError::Failed("no frames to encode".into()));
        }
        let _job = self.job.lock();
        let mut staging = StagingGuard::new(Arc::clone(&self.engine));

        for (index, png) in frames.iter().enumerate() {
            staging.stage(&frame_file_name(index as u32), png)?;
        }
        staging.track_output(&request.output);
        debug!(engine = self.engine.name(), frames = frames.len(), "Frames staged");

        let progress = MonotonicProgress::new();
        self.engine.run(request, &mut |ratio| {
            if let Some(p) = progress.advance(ratio) {
                on_progress(p);
            }
        })?;

        let output = self.engine.read_file(&request.output)?;
        if output.is_empty() {
            return Err(EncodeError::Failed(format!("{} is empty", request.output)));
        }
        if let Some(p) = progress.advance(1.0) {
            on_progress(p);
        }
        info!(engine = self.engine.name(), bytes = output.len(), "Encode finished");
        Ok(output)
    }
}
