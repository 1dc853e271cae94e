//! Shared fixtures: in-memory engine, loaders, sources and sessions.

use capsule_ai::{
    DetectionError, DetectionResult, Detector, Enhancer, NullDetector, SourceImage,
    TemplateNarrator,
};
use capsule_app::{ComposerOptions, Session, VideoComposer};
use capsule_core::{EnhancementSettings, Provenance, RasterImage, UpscaleFactor};
use capsule_media::{
    EncodeError, EncodeRequest, EncodeResult, EncoderHandle, EncodingEngine, EngineLoader,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::Arc;

/// Bytes the fake engine writes as its "video".
pub const FAKE_MP4: &[u8] = b"\0\0\0\x18ftypisom-fake";

/// What one engine run saw.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub request: EncodeRequest,
    pub frame_names: Vec<String>,
    pub first_frame: Vec<u8>,
    pub last_frame: Vec<u8>,
}

/// Engine over an in-memory file map.
#[derive(Default)]
pub struct FakeEngine {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    runs: Mutex<Vec<RunRecord>>,
    fail_with: Option<String>,
    gate: Option<Mutex<mpsc::Receiver<()>>>,
}

impl FakeEngine {
    /// An engine whose runs stage and report progress, then fail.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// An engine whose runs block until the returned sender fires.
    pub fn gated() -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let engine = Self {
            gate: Some(Mutex::new(rx)),
            ..Self::default()
        };
        (engine, tx)
    }

    pub fn stored_files(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }

    pub fn runs(&self) -> Vec<RunRecord> {
        self.runs.lock().clone()
    }
}

impl EncodingEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn write_file(&self, name: &str, data: &[u8]) -> EncodeResult<()> {
        self.files.lock().insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn read_file(&self, name: &str) -> EncodeResult<Vec<u8>> {
        self.files
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| EncodeError::Failed(format!("{name} missing")))
    }

    fn unlink(&self, name: &str) -> EncodeResult<()> {
        self.files.lock().remove(name);
        Ok(())
    }

    fn run(&self, request: &EncodeRequest, on_progress: &mut dyn FnMut(f32)) -> EncodeResult<()> {
        if let Some(gate) = &self.gate {
            let _ = gate.lock().recv();
        }
        let mut files = self.files.lock();
        // BTreeMap keeps zero-padded frame names in index order.
        let frames: Vec<(String, Vec<u8>)> = files
            .iter()
            .filter(|(name, _)| name.starts_with("frame_"))
            .map(|(name, data)| (name.clone(), data.clone()))
            .collect();
        for done in [60.0, 120.0, 30.0, 240.0] {
            on_progress(done / request.expected_frames as f32);
        }
        self.runs.lock().push(RunRecord {
            request: request.clone(),
            frame_names: frames.iter().map(|(n, _)| n.clone()).collect(),
            first_frame: frames.first().map(|(_, d)| d.clone()).unwrap_or_default(),
            last_frame: frames.last().map(|(_, d)| d.clone()).unwrap_or_default(),
        });
        if let Some(message) = &self.fail_with {
            return Err(EncodeError::Failed(message.clone()));
        }
        files.insert(request.output.clone(), FAKE_MP4.to_vec());
        Ok(())
    }

    fn teardown(&self) -> EncodeResult<()> {
        self.files.lock().clear();
        Ok(())
    }
}

/// Loader handing out the same engine every time.
pub fn shared_loader(engine: Arc<FakeEngine>) -> EngineLoader {
    Arc::new(move || Ok(Arc::clone(&engine) as Arc<dyn EncodingEngine>))
}

/// Loader that always fails to find its binary.
pub fn missing_loader() -> EngineLoader {
    Arc::new(|| Err(EncodeError::Unavailable("ffmpeg not found on PATH".into())))
}

/// Loader that blocks until the returned sender fires.
pub fn gated_loader(engine: Arc<FakeEngine>) -> (EngineLoader, mpsc::Sender<()>) {
    let (tx, rx) = mpsc::channel::<()>();
    let rx = Mutex::new(rx);
    let loader: EngineLoader = Arc::new(move || {
        let _ = rx.lock().recv();
        Ok(Arc::clone(&engine) as Arc<dyn EncodingEngine>)
    });
    (loader, tx)
}

/// Detector that is never available.
pub struct BrokenDetector;

impl Detector for BrokenDetector {
    fn name(&self) -> &str {
        "broken"
    }

    fn detect(&self, _image: &RasterImage) -> DetectionResult<Vec<String>> {
        Err(DetectionError::ModelUnavailable("no model installed".into()))
    }
}

pub fn solid_png(name: &str, w: u32, h: u32, rgba: [u8; 4]) -> SourceImage {
    let png = RasterImage::solid(w, h, rgba, Provenance::synthetic(name))
        .unwrap()
        .to_png()
        .unwrap();
    SourceImage::new(name, png)
}

pub fn broken_source(name: &str) -> SourceImage {
    SourceImage::new(name, vec![0x89, b'P', b'N', b'G', 0, 1, 2])
}

pub fn plain_settings() -> EnhancementSettings {
    EnhancementSettings::new(UpscaleFactor::X1, 0.0, 1.0, 1.0, 0.0).unwrap()
}

pub fn session_with(loader: EngineLoader, detector: Arc<dyn Detector>) -> Arc<Session> {
    let enhancer = Enhancer::new(detector, Arc::new(TemplateNarrator::default()));
    let composer = VideoComposer::new(
        Arc::new(EncoderHandle::new(loader)),
        ComposerOptions::default(),
    );
    Arc::new(Session::new(enhancer, composer))
}

pub fn session(loader: EngineLoader) -> Arc<Session> {
    session_with(loader, Arc::new(NullDetector))
}
