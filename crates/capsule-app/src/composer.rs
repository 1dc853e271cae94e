//! Video compose orchestrator.
//!
//! Drives one render at a time through the state machine: synthesize all
//! frames (bounded parallelism, index order), acquire the encoder, encode,
//! publish the artifact. State snapshots are published on a watch channel.
//! `reset` bumps the render epoch; a render from an older epoch stops at its
//! next checkpoint and its results are dropped.

use crate::state::{RenderEvent, VideoArtifact, VideoRenderState};
use capsule_core::capsule::TOTAL_FRAMES;
use capsule_core::{CapsuleError, EnhancedImage, Result};
use capsule_media::{CapsuleEncodeArgs, EncoderHandle};
use capsule_render::{CaptionFont, FrameSynthesizer};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Composer tuning.
#[derive(Debug, Clone)]
pub struct ComposerOptions {
    /// Frames rendered per parallel chunk.
    pub parallelism: usize,
    /// Caption font; text layers are skipped without one.
    pub font: Option<Arc<CaptionFont>>,
}

impl Default for ComposerOptions {
    fn default() -> Self {
        Self {
            parallelism: num_cpus::get().max(1),
            font: None,
        }
    }
}

/// State shared with blocking tasks.
struct Shared {
    /// Current epoch and state, updated together.
    current: Mutex<(u64, VideoRenderState)>,
    tx: watch::Sender<VideoRenderState>,
}

impl Shared {
    /// Apply `event` if `epoch` is still current. Returns the new state.
    fn apply(&self, epoch: u64, event: RenderEvent) -> Result<VideoRenderState> {
        let mut current = self.current.lock();
        if current.0 != epoch {
            return Err(CapsuleError::InvalidStateTransition(format!(
                "render {epoch} superseded by reset"
            )));
        }
        let next = current.1.apply(event)?;
        current.1 = next.clone();
        self.tx.send_replace(next.clone());
        Ok(next)
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.current.lock().0 == epoch
    }
}

/// Composes capsule videos from enhanced images.
pub struct VideoComposer {
    shared: Arc<Shared>,
    encoder: Arc<EncoderHandle>,
    options: ComposerOptions,
}

impl VideoComposer {
    pub fn new(encoder: Arc<EncoderHandle>, options: ComposerOptions) -> Self {
        let (tx, _rx) = watch::channel(VideoRenderState::Idle);
        Self {
            shared: Arc::new(Shared {
                current: Mutex::new((0, VideoRenderState::Idle)),
                tx,
            }),
            encoder,
            options,
        }
    }

    /// Latest state snapshot.
    pub fn state(&self) -> VideoRenderState {
        self.shared.current.lock().1.clone()
    }

    /// Receiver of state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<VideoRenderState> {
        self.shared.tx.subscribe()
    }

    pub fn encoder(&self) -> &Arc<EncoderHandle> {
        &self.encoder
    }

    /// Render `source` into a capsule video.
    ///
    /// Only valid from `Idle`; otherwise rejected with
    /// `InvalidStateTransition` and the in-flight render is untouched.
    /// Failures end in `Failed` and are also returned.
    pub async fn compose(&self, source: Arc<EnhancedImage>) -> Result<Arc<VideoArtifact>> {
        let epoch = {
            let mut current = self.shared.current.lock();
            let next = current.1.apply(RenderEvent::Compose)?;
            current.0 += 1;
            current.1 = next.clone();
            self.shared.tx.send_replace(next);
            current.0
        };
        info!(epoch, source = %source.source.name, "Composing capsule");

        match self.render(epoch, &source).await {
            Ok(artifact) => {
                self.shared
                    .apply(epoch, RenderEvent::Finished(Arc::clone(&artifact)))?;
                info!(epoch, bytes = artifact.len(), "Capsule ready");
                Ok(artifact)
            }
            Err(e) => {
                if self.shared.is_current(epoch) {
                    warn!(epoch, error = %e, "Capsule render failed");
                    self.shared.apply(epoch, RenderEvent::Failed(e.to_string()))?;
                } else {
                    debug!(epoch, error = %e, "Superseded render stopped");
                }
                Err(e)
            }
        }
    }

    async fn render(&self, epoch: u64, source: &Arc<EnhancedImage>) -> Result<Arc<VideoArtifact>> {
        let font = self.options.font.clone();
        let image = Arc::clone(source);
        let synth = Arc::new(
            tokio::task::spawn_blocking(move || FrameSynthesizer::new(&image, font.as_deref()))
                .await
                .map_err(join_error)??,
        );

        let chunk = self.options.parallelism.clamp(1, TOTAL_FRAMES as usize) as u32;
        let mut frames = Vec::with_capacity(TOTAL_FRAMES as usize);
        let mut start = 0;
        while start < TOTAL_FRAMES {
            let end = (start + chunk).min(TOTAL_FRAMES);
            let synth = Arc::clone(&synth);
            let pngs = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<u8>>> {
                synth
                    .render_range(start..end)?
                    .into_par_iter()
                    .map(|frame| frame.to_png())
                    .collect()
            })
            .await
            .map_err(join_error)??;
            frames.extend(pngs);
            start = end;
            self.shared.apply(
                epoch,
                RenderEvent::FramesProgress(frames.len() as f32 / TOTAL_FRAMES as f32),
            )?;
        }
        debug!(epoch, frames = frames.len(), "Frames synthesized");

        let driver = self.encoder.acquire().await?;
        self.shared.apply(epoch, RenderEvent::FramesDone)?;

        let shared = Arc::clone(&self.shared);
        let provenance = source.source.clone();
        let bytes = tokio::task::spawn_blocking(move || {
            let request = CapsuleEncodeArgs::default().build();
            driver.encode(&frames, &request, &mut |ratio| {
                // Stale ticks after a reset are dropped.
                let _ = shared.apply(epoch, RenderEvent::EncodeProgress(ratio));
            })
        })
        .await
        .map_err(join_error)??;

        if !self.shared.is_current(epoch) {
            return Err(CapsuleError::InvalidStateTransition(format!(
                "render {epoch} superseded by reset"
            )));
        }
        Ok(Arc::new(VideoArtifact::new(bytes, provenance)))
    }

    /// Return to `Idle`, releasing any artifact and invalidating an
    /// in-flight render.
    pub fn reset(&self) {
        let previous = {
            let mut current = self.shared.current.lock();
            current.0 += 1;
            let previous = std::mem::take(&mut current.1);
            self.shared.tx.send_replace(VideoRenderState::Idle);
            previous
        };
        debug!(from = previous.name(), "Video reset");
        drop(previous);
    }
}

fn join_error(e: tokio::task::JoinError) -> CapsuleError {
    CapsuleError::Internal(format!("render task failed: {e}"))
}
