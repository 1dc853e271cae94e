//! Video render state machine.
//!
//! `Idle → Preparing → Rendering → Ready | Failed`, and back to `Idle` only
//! through `Reset`. Transitions are a pure function of the current state and
//! an event; the composer applies them and publishes the result.

use capsule_core::{CapsuleError, Provenance, Result, VIDEO_FILE_NAME};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// An encoded capsule video.
#[derive(Debug)]
pub struct VideoArtifact {
    /// Content handle for playback and download.
    pub id: Uuid,
    /// The image the video was composed from.
    pub source: Provenance,
    bytes: Vec<u8>,
}

impl VideoArtifact {
    pub const MIME_TYPE: &'static str = "video/mp4";

    pub fn new(bytes: Vec<u8>, source: Provenance) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            bytes,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write the video into `dir` under its download name.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(VIDEO_FILE_NAME);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Observable state of the video composer.
#[derive(Debug, Clone, Default)]
pub enum VideoRenderState {
    #[default]
    Idle,
    /// Synthesizing frames; progress is frames done / total.
    Preparing { progress: f32 },
    /// Encoding; progress is the engine's ratio, clamped.
    Rendering { progress: f32 },
    Ready { artifact: Arc<VideoArtifact> },
    Failed { message: String },
}

impl VideoRenderState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Preparing { .. } => "preparing",
            Self::Rendering { .. } => "rendering",
            Self::Ready { .. } => "ready",
            Self::Failed { .. } => "failed",
        }
    }

    /// Progress of the current stage in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        match self {
            Self::Idle | Self::Failed { .. } => 0.0,
            Self::Preparing { progress } | Self::Rendering { progress } => *progress,
            Self::Ready { .. } => 1.0,
        }
    }

    /// A render is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Preparing { .. } | Self::Rendering { .. })
    }

    pub fn artifact(&self) -> Option<&Arc<VideoArtifact>> {
        match self {
            Self::Ready { artifact } => Some(artifact),
            _ => None,
        }
    }

    /// Apply an event, returning the next state.
    ///
    /// Progress ticks never move a stage backwards and are clamped to
    /// `[0, 1]`. Anything not allowed from the current state is rejected
    /// with `InvalidStateTransition`.
    pub fn apply(&self, event: RenderEvent) -> Result<Self> {
        use RenderEvent as E;
        let next = match (self, event) {
            (_, E::Reset) => Self::Idle,
            (Self::Idle, E::Compose) => Self::Preparing { progress: 0.0 },
            (Self::Preparing { progress }, E::FramesProgress(p)) => Self::Preparing {
                progress: advance(*progress, p),
            },
            (Self::Preparing { .. }, E::FramesDone) => Self::Rendering { progress: 0.0 },
            (Self::Rendering { progress }, E::EncodeProgress(p)) => Self::Rendering {
                progress: advance(*progress, p),
            },
            (Self::Rendering { .. }, E::Finished(artifact)) => Self::Ready { artifact },
            (Self::Preparing { .. } | Self::Rendering { .. }, E::Failed(message)) => {
                Self::Failed { message }
            }
            (state, event) => {
                return Err(CapsuleError::InvalidStateTransition(format!(
                    "{} cannot handle {}",
                    state.name(),
                    event.name()
                )))
            }
        };
        Ok(next)
    }
}

fn advance(current: f32, tick: f32) -> f32 {
    if tick.is_finite() {
        current.max(tick.clamp(0.0, 1.0))
    } else {
        current
    }
}

/// Inputs to the render state machine.
#[derive(Debug, Clone)]
pub enum RenderEvent {
    Compose,
    FramesProgress(f32),
    FramesDone,
    EncodeProgress(f32),
    Finished(Arc<VideoArtifact>),
    Failed(String),
    Reset,
}

impl RenderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Compose => "compose",
            Self::FramesProgress(_) => "frame progress",
            Self::FramesDone => "frames done",
            Self::EncodeProgress(_) => "encode progress",
            Self::Finished(_) => "finished",
            Self::Failed(_) => "failure",
            Self::Reset => "reset",
        }
    }
}
