//! Batch enhancement orchestration.
//!
//! Each input runs filter pipeline → detection → narrative on the blocking
//! pool. Results are joined in input order and committed as one `Batch`.
//! The newest successful run wins: an older run that finishes after a newer
//! run committed (or after a reset) is discarded. A newer run that fails
//! does not block an older one from committing.

use crate::detection::Detector;
use crate::narrative::NarrativeBuilder;
use capsule_core::{
    enhanced_file_name, CapsuleError, EnhancedImage, EnhancementSettings, RasterImage, Result,
};
use parking_lot::RwLock;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Raw encoded input, as uploaded.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read an image file from disk. The file name becomes the source name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }
}

/// An ordered set of enhanced images from one enhancement run.
#[derive(Debug, Clone)]
pub struct Batch {
    generation: u64,
    settings: EnhancementSettings,
    items: Vec<Arc<EnhancedImage>>,
}

impl Batch {
    /// An empty batch.
    pub fn empty(generation: u64) -> Self {
        Self {
            generation,
            settings: EnhancementSettings::default(),
            items: Vec::new(),
        }
    }

    /// Run number that produced this batch. Strictly increases across commits
    /// and resets.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn settings(&self) -> &EnhancementSettings {
        &self.settings
    }

    /// Items in input order.
    pub fn items(&self) -> &[Arc<EnhancedImage>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<EnhancedImage>> {
        self.items.get(index)
    }

    /// Download names paired with PNG bytes, in input order.
    pub fn export_pngs(&self) -> Result<Vec<(String, Vec<u8>)>> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| Ok((enhanced_file_name(i), item.to_png()?)))
            .collect()
    }
}

/// Owns the current batch and runs enhancement over new inputs.
pub struct Enhancer {
    detector: Arc<dyn Detector>,
    narrator: Arc<dyn NarrativeBuilder>,
    current: RwLock<Arc<Batch>>,
    latest_ticket: AtomicU64,
}

impl Enhancer {
    pub fn new(detector: Arc<dyn Detector>, narrator: Arc<dyn NarrativeBuilder>) -> Self {
        Self {
            detector,
            narrator,
            current: RwLock::new(Arc::new(Batch::empty(0))),
            latest_ticket: AtomicU64::new(0),
        }
    }

    /// Snapshot of the committed batch.
    pub fn current(&self) -> Arc<Batch> {
        self.current.read().clone()
    }

    /// Enhance all inputs with one settings value and replace the current
    /// batch.
    ///
    /// Detection failures degrade to empty labels. Any decode or filter
    /// failure fails the whole run and leaves the committed batch untouched.
    pub async fn enhance_batch(
        &self,
        inputs: Vec<SourceImage>,
        settings: EnhancementSettings,
    ) -> Result<Arc<Batch>> {
        let ticket = self.latest_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        info!(ticket, images = inputs.len(), "Enhancing batch");

        let handles: Vec<_> = inputs
            .into_iter()
            .map(|input| {
                let detector = Arc::clone(&self.detector);
                let narrator = Arc::clone(&self.narrator);
                tokio::task::spawn_blocking(move || {
                    process_one(&input, &settings, detector.as_ref(), narrator.as_ref())
                })
            })
            .collect();

        // Awaiting in spawn order keeps input order; all tasks still run
        // concurrently.
        let mut items = Vec::with_capacity(handles.len());
        let mut first_error = None;
        for handle in handles {
            let outcome = handle
                .await
                .map_err(|e| CapsuleError::Internal(format!("enhancement task failed: {e}")))
                .and_then(|r| r);
            match outcome {
                Ok(item) => items.push(Arc::new(item)),
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(_) => {}
            }
        }
        if let Some(e) = first_error {
            warn!(ticket, error = %e, "Batch failed, keeping previous results");
            return Err(e);
        }

        let batch = Arc::new(Batch {
            generation: ticket,
            settings,
            items,
        });

        let mut current = self.current.write();
        // A newer committed batch or a reset carries a higher generation.
        if current.generation >= ticket {
            debug!(ticket, committed = current.generation, "Discarding superseded batch");
            return Err(CapsuleError::InvalidStateTransition(format!(
                "batch {ticket} superseded by a newer run"
            )));
        }
        // Dropping the old Arc releases its rasters once no reader holds them.
        *current = Arc::clone(&batch);
        info!(ticket, images = batch.len(), "Batch committed");
        Ok(batch)
    }

    /// Clear the current batch and invalidate in-flight runs.
    pub fn reset(&self) {
        let ticket = self.latest_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        *self.current.write() = Arc::new(Batch::empty(ticket));
        debug!(ticket, "Batch reset");
    }
}

fn process_one(
    input: &SourceImage,
    settings: &EnhancementSettings,
    detector: &dyn Detector,
    narrator: &dyn NarrativeBuilder,
) -> Result<EnhancedImage> {
    let raster: RasterImage = capsule_enhance::enhance_bytes(&input.bytes, &input.name, settings)?;

    let labels = detect_labels(&input.name, &raster, detector);
    let narrative = narrator.build(&labels);
    debug!(source = %input.name, labels = labels.len(), "Image enhanced");

    Ok(EnhancedImage::new(
        Arc::new(raster),
        *settings,
        labels,
        narrative,
    ))
}

/// Labels for one raster. Errors and panics inside the detector both
/// degrade to no labels.
fn detect_labels(source: &str, raster: &RasterImage, detector: &dyn Detector) -> Vec<String> {
    match panic::catch_unwind(AssertUnwindSafe(|| detector.detect(raster))) {
        Ok(Ok(labels)) => labels,
        Ok(Err(e)) => {
            warn!(
                source,
                detector = detector.name(),
                error = %e,
                "Detection failed, continuing without labels"
            );
            Vec::new()
        }
        Err(payload) => {
            warn!(
                source,
                detector = detector.name(),
                reason = panic_message(payload.as_ref()),
                "Detector panicked, continuing without labels"
            );
            Vec::new()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{NullDetector, ToneDetector};
    use crate::error::{DetectionError, DetectionResult};
    use crate::narrative::TemplateNarrator;
    use capsule_core::{Provenance, UpscaleFactor};
    use parking_lot::Mutex;
    use tokio::sync::mpsc;

    struct FailingDetector;

    impl Detector for FailingDetector {
        fn name(&self) -> &str {
            "failing"
        }

        fn detect(&self, _image: &RasterImage) -> DetectionResult<Vec<String>> {
            Err(DetectionError::Inference("boom".into()))
        }
    }

    struct PanickingDetector;

    impl Detector for PanickingDetector {
        fn name(&self) -> &str {
            "panicking"
        }

        fn detect(&self, _image: &RasterImage) -> DetectionResult<Vec<String>> {
            panic!("model crashed")
        }
    }

    /// Blocks detection of `held` until released; announces when it starts
    /// waiting.
    struct GateDetector {
        held: &'static str,
        entered: mpsc::UnboundedSender<()>,
        release: Mutex<mpsc::UnboundedReceiver<()>>,
    }

    impl Detector for GateDetector {
        fn name(&self) -> &str {
            "gate"
        }

        fn detect(&self, image: &RasterImage) -> DetectionResult<Vec<String>> {
            if image.provenance().name == self.held {
                let _ = self.entered.send(());
                let _ = self.release.lock().blocking_recv();
            }
            Ok(vec![])
        }
    }

    fn png(w: u32, h: u32, rgba: [u8; 4], name: &str) -> SourceImage {
        let raster = RasterImage::solid(w, h, rgba, Provenance::synthetic(name)).unwrap();
        SourceImage::new(name, raster.to_png().unwrap())
    }

    fn enhancer(detector: Arc<dyn Detector>) -> Enhancer {
        Enhancer::new(detector, Arc::new(TemplateNarrator::default()))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_batch_preserves_input_order() {
        let e = enhancer(Arc::new(ToneDetector::default()));
        let inputs = vec![
            png(8, 6, [10, 10, 10, 255], "a.png"),
            png(5, 9, [200, 200, 200, 255], "b.png"),
            png(3, 3, [40, 70, 140, 255], "c.png"),
        ];
        let batch = e
            .enhance_batch(inputs, EnhancementSettings::default())
            .await
            .unwrap();
        let names: Vec<_> = batch.items().iter().map(|i| i.source.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
        assert_eq!((batch.items()[1].width, batch.items()[1].height), (10, 18));
        assert!(Arc::ptr_eq(&batch, &e.current()));
    }

    #[tokio::test]
    async fn test_detection_failure_is_swallowed() {
        let e = enhancer(Arc::new(FailingDetector));
        let batch = e
            .enhance_batch(
                vec![png(4, 4, [1, 2, 3, 255], "x.png")],
                EnhancementSettings::default(),
            )
            .await
            .unwrap();
        let item = &batch.items()[0];
        assert!(item.labels.is_empty());
        assert!(!item.narrative_lines().is_empty());
    }

    #[tokio::test]
    async fn test_detector_panic_is_swallowed() {
        let e = enhancer(Arc::new(PanickingDetector));
        let batch = e
            .enhance_batch(
                vec![
                    png(4, 4, [1, 2, 3, 255], "x.png"),
                    png(4, 4, [3, 2, 1, 255], "y.png"),
                ],
                EnhancementSettings::default(),
            )
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch.items().iter().all(|i| i.labels.is_empty()));
        assert!(!batch.items()[0].narrative_lines().is_empty());
        assert!(Arc::ptr_eq(&batch, &e.current()));
    }

    #[tokio::test]
    async fn test_decode_failure_keeps_previous_batch() {
        let e = enhancer(Arc::new(NullDetector));
        let first = e
            .enhance_batch(
                vec![png(4, 4, [9, 9, 9, 255], "ok.png")],
                EnhancementSettings::default(),
            )
            .await
            .unwrap();

        let err = e
            .enhance_batch(
                vec![
                    png(4, 4, [9, 9, 9, 255], "ok.png"),
                    SourceImage::new("broken.jpg", b"not an image".to_vec()),
                ],
                EnhancementSettings::default(),
            )
            .await;
        assert!(matches!(err, Err(CapsuleError::Decode(_))));
        assert!(Arc::ptr_eq(&first, &e.current()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_newer_run_lets_older_commit() {
        let (entered_tx, mut entered) = mpsc::unbounded_channel();
        let (release, release_rx) = mpsc::unbounded_channel();
        let e = Arc::new(enhancer(Arc::new(GateDetector {
            held: "slow.png",
            entered: entered_tx,
            release: Mutex::new(release_rx),
        })));

        let older = {
            let e = Arc::clone(&e);
            tokio::spawn(async move {
                e.enhance_batch(
                    vec![png(4, 4, [5, 5, 5, 255], "slow.png")],
                    EnhancementSettings::default(),
                )
                .await
            })
        };
        entered.recv().await.unwrap();

        let newer = e
            .enhance_batch(
                vec![SourceImage::new("broken.jpg", b"nope".to_vec())],
                EnhancementSettings::default(),
            )
            .await;
        assert!(newer.is_err());

        release.send(()).unwrap();
        let batch = older.await.unwrap().unwrap();
        assert_eq!(batch.items()[0].source.name, "slow.png");
        assert!(Arc::ptr_eq(&batch, &e.current()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_older_run_discarded_after_newer_commit() {
        let (entered_tx, mut entered) = mpsc::unbounded_channel();
        let (release, release_rx) = mpsc::unbounded_channel();
        let e = Arc::new(enhancer(Arc::new(GateDetector {
            held: "slow.png",
            entered: entered_tx,
            release: Mutex::new(release_rx),
        })));

        let older = {
            let e = Arc::clone(&e);
            tokio::spawn(async move {
                e.enhance_batch(
                    vec![png(4, 4, [5, 5, 5, 255], "slow.png")],
                    EnhancementSettings::default(),
                )
                .await
            })
        };
        entered.recv().await.unwrap();

        let newer = e
            .enhance_batch(
                vec![png(4, 4, [7, 7, 7, 255], "fast.png")],
                EnhancementSettings::default(),
            )
            .await
            .unwrap();

        release.send(()).unwrap();
        assert!(matches!(
            older.await.unwrap(),
            Err(CapsuleError::InvalidStateTransition(_))
        ));
        assert!(Arc::ptr_eq(&newer, &e.current()));
    }

    #[tokio::test]
    async fn test_reprocess_with_new_settings() {
        let e = enhancer(Arc::new(NullDetector));
        let input = png(6, 4, [120, 80, 60, 255], "p.png");
        let a = e
            .enhance_batch(vec![input.clone()], EnhancementSettings::default())
            .await
            .unwrap();
        let b = e
            .enhance_batch(
                vec![input],
                EnhancementSettings::neutral(UpscaleFactor::X4),
            )
            .await
            .unwrap();
        assert!(b.generation() > a.generation());
        assert_eq!((b.items()[0].width, b.items()[0].height), (24, 16));
    }

    #[tokio::test]
    async fn test_reset_releases_rasters() {
        let e = enhancer(Arc::new(NullDetector));
        let batch = e
            .enhance_batch(
                vec![png(4, 4, [0, 0, 0, 255], "r.png")],
                EnhancementSettings::default(),
            )
            .await
            .unwrap();
        let weak = Arc::downgrade(&batch.items()[0].raster);
        drop(batch);
        e.reset();
        assert!(e.current().is_empty());
        assert!(weak.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_export_names() {
        let e = enhancer(Arc::new(NullDetector));
        let batch = e
            .enhance_batch(
                vec![
                    png(2, 2, [0, 0, 0, 255], "a.png"),
                    png(2, 2, [0, 0, 0, 255], "b.png"),
                ],
                EnhancementSettings::neutral(UpscaleFactor::X1),
            )
            .await
            .unwrap();
        let files = batch.export_pngs().unwrap();
        assert_eq!(files[0].0, "ugc-image-enhanced-1.png");
        assert_eq!(files[1].0, "ugc-image-enhanced-2.png");
        assert!(files[0].1.starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
