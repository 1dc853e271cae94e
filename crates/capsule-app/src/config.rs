//! Application configuration loaded from TOML.

use crate::composer::{ComposerOptions, VideoComposer};
use crate::session::Session;
use capsule_ai::{Detector, Enhancer, NullDetector, TemplateNarrator, ToneDetector};
use capsule_core::{CapsuleError, EnhancementSettings, Result};
use capsule_media::{EncoderHandle, EngineConfig};
use capsule_render::CaptionFont;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Which detection adapter to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    #[default]
    Tone,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapsuleConfig {
    /// Where enhanced images and videos are written.
    pub output_dir: PathBuf,
    /// FFmpeg binary; searched on `PATH` when unset.
    pub ffmpeg_path: Option<PathBuf>,
    /// Caption font; common system fonts are tried when unset.
    pub font_path: Option<PathBuf>,
    /// Frames synthesized per parallel chunk.
    pub parallelism: usize,
    /// Parent of the encoder's working storage; system temp when unset.
    pub work_dir: Option<PathBuf>,
    pub detector: DetectorKind,
    /// Settings used when the command line does not override them.
    pub enhancement: EnhancementSettings,
}

impl Default for CapsuleConfig {
    fn default() -> Self {
        Self {
            enhancement: EnhancementSettings::default(),
            output_dir: PathBuf::from("."),
            ffmpeg_path: None,
            font_path: None,
            parallelism: num_cpus::get(),
            work_dir: None,
            detector: DetectorKind::default(),
        }
    }
}

impl CapsuleConfig {
    /// `<config dir>/ugc-capsule/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ugc-capsule").join("config.toml"))
    }

    /// Load from `path` if given (it must exist), else from the default
    /// location if present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(p) => p,
                None => {
                    debug!("No config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };
        let text = std::fs::read_to_string(&path).map_err(|e| {
            CapsuleError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&text)
            .map_err(|e| CapsuleError::Config(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| CapsuleError::Config(e.to_string()))?;
        config.parallelism = config.parallelism.max(1);
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CapsuleError::Config(e.to_string()))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            binary: self.ffmpeg_path.clone(),
            work_root: self.work_dir.clone(),
        }
    }

    pub fn detector(&self) -> Arc<dyn Detector> {
        match self.detector {
            DetectorKind::Tone => Arc::new(ToneDetector::default()),
            DetectorKind::None => Arc::new(NullDetector),
        }
    }

    /// Wire a session from this configuration, sharing `encoder`.
    pub fn build_session(&self, encoder: Arc<EncoderHandle>) -> Session {
        let enhancer = Enhancer::new(self.detector(), Arc::new(TemplateNarrator::default()));
        let font = CaptionFont::discover(self.font_path.as_deref()).map(Arc::new);
        if let Some(font) = &font {
            info!(font = font.source(), "Captions enabled");
        }
        let composer = VideoComposer::new(
            encoder,
            ComposerOptions {
                parallelism: self.parallelism.max(1),
                font,
            },
        );
        Session::new(enhancer, composer)
    }
}
