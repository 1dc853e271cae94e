//! Session context: the current batch, the selected image and the composer.

use crate::composer::VideoComposer;
use crate::state::{VideoArtifact, VideoRenderState};
use capsule_ai::{Batch, Enhancer, SourceImage};
use capsule_core::{CapsuleError, EnhancedImage, EnhancementSettings, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Selected render source: batch generation plus index into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Selection {
    generation: u64,
    index: usize,
}

/// Everything one user works with at a time.
pub struct Session {
    enhancer: Enhancer,
    composer: VideoComposer,
    selection: Mutex<Option<Selection>>,
}

impl Session {
    pub fn new(enhancer: Enhancer, composer: VideoComposer) -> Self {
        Self {
            enhancer,
            composer,
            selection: Mutex::new(None),
        }
    }

    pub fn enhancer(&self) -> &Enhancer {
        &self.enhancer
    }

    pub fn composer(&self) -> &VideoComposer {
        &self.composer
    }

    pub fn batch(&self) -> Arc<Batch> {
        self.enhancer.current()
    }

    pub fn video_state(&self) -> VideoRenderState {
        self.composer.state()
    }

    pub fn subscribe_video(&self) -> watch::Receiver<VideoRenderState> {
        self.composer.subscribe()
    }

    /// Enhance a new batch. On success the selection is cleared.
    pub async fn enhance(
        &self,
        inputs: Vec<SourceImage>,
        settings: EnhancementSettings,
    ) -> Result<Arc<Batch>> {
        let batch = self.enhancer.enhance_batch(inputs, settings).await?;
        *self.selection.lock() = None;
        Ok(batch)
    }

    /// Select image `index` of the current batch as render source. Any
    /// previous video is released.
    pub fn select(&self, index: usize) -> Result<Arc<EnhancedImage>> {
        let batch = self.enhancer.current();
        let image = batch.get(index).cloned().ok_or_else(|| {
            CapsuleError::NotFound(format!("image {index} in a batch of {}", batch.len()))
        })?;
        self.composer.reset();
        *self.selection.lock() = Some(Selection {
            generation: batch.generation(),
            index,
        });
        debug!(index, generation = batch.generation(), "Render source selected");
        Ok(image)
    }

    /// The selected image, if it still belongs to the current batch.
    pub fn selected(&self) -> Option<Arc<EnhancedImage>> {
        let selection = (*self.selection.lock())?;
        let batch = self.enhancer.current();
        (batch.generation() == selection.generation)
            .then(|| batch.get(selection.index).cloned())
            .flatten()
    }

    /// Compose the selected image.
    pub async fn compose_selected(&self) -> Result<Arc<VideoArtifact>> {
        let source = self.selected().ok_or_else(|| {
            CapsuleError::InvalidStateTransition("no render source selected".into())
        })?;
        self.composer.compose(source).await
    }

    /// Release the video only.
    pub fn reset_video(&self) {
        self.composer.reset();
    }

    /// Release batch, selection and video.
    pub fn reset(&self) {
        self.composer.reset();
        *self.selection.lock() = None;
        self.enhancer.reset();
    }
}
