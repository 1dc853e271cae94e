//! Lazily loaded, shareable encoder.
//!
//! The engine is loaded on first use, off the async threads. A failed load
//! leaves the handle empty so the next `acquire` retries.

use crate::driver::EncoderDriver;
use crate::engine::EncodingEngine;
use crate::error::{EncodeError, EncodeResult};
use crate::ffmpeg::{EngineConfig, FfmpegEngine};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Produces a ready engine. Runs on the blocking pool.
pub type EngineLoader =
    Arc<dyn Fn() -> EncodeResult<Arc<dyn EncodingEngine>> + Send + Sync + 'static>;

/// Loader for the FFmpeg engine.
pub fn ffmpeg_loader(config: EngineConfig) -> EngineLoader {
    Arc::new(move || {
        let engine: Arc<dyn EncodingEngine> = Arc::new(FfmpegEngine::load(&config)?);
        Ok(engine)
    })
}

/// Shared handle to at most one loaded engine.
pub struct EncoderHandle {
    loader: EngineLoader,
    cell: Mutex<Arc<OnceCell<Arc<EncoderDriver>>>>,
}

impl EncoderHandle {
    pub fn new(loader: EngineLoader) -> Self {
        Self {
            loader,
            cell: Mutex::new(Arc::new(OnceCell::new())),
        }
    }

    /// Handle backed by FFmpeg.
    pub fn ffmpeg(config: EngineConfig) -> Self {
        Self::new(ffmpeg_loader(config))
    }

    /// Whether an engine is currently loaded.
    pub fn is_loaded(&self) -> bool {
        self.cell.lock().initialized()
    }

    /// The driver, loading the engine first if needed. Any load failure is
    /// reported as `Unavailable`.
    pub async fn acquire(&self) -> EncodeResult<Arc<EncoderDriver>> {
        let cell = self.cell.lock().clone();
        let driver = cell
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                let engine = tokio::task::spawn_blocking(move || loader())
                    .await
                    .map_err(|e| EncodeError::Unavailable(format!("engine loader panicked: {e}")))?
                    .map_err(|e| match e {
                        EncodeError::Unavailable(msg) => EncodeError::Unavailable(msg),
                        other => EncodeError::Unavailable(other.to_string()),
                    })?;
                debug!(engine = engine.name(), "Encoder engine ready");
                Ok::<_, EncodeError>(Arc::new(EncoderDriver::new(engine)))
            })
            .await
            .map_err(|e| {
                warn!(error = %e, "Encoder engine failed to load");
                e
            })?;
        Ok(Arc::clone(driver))
    }

    /// Tear down the loaded engine, if any. The next `acquire` loads afresh.
    pub fn teardown(&self) -> EncodeResult<()> {
        let previous = std::mem::replace(&mut *self.cell.lock(), Arc::new(OnceCell::new()));
        match previous.get() {
            Some(driver) => driver.engine().teardown(),
            None => Ok(()),
        }
    }
}
