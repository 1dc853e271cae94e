//! FFmpeg-backed encoding engine.
//!
//! Engine storage is a private temporary directory; FFmpeg runs with it as
//! the working directory so request arguments use bare file names.

use crate::engine::{validate_name, EncodingEngine};
use crate::error::{EncodeError, EncodeResult};
use crate::request::EncodeRequest;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Where to find FFmpeg and where to put its working storage.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Explicit FFmpeg binary. Searched on `PATH` when unset.
    pub binary: Option<PathBuf>,
    /// Parent directory for engine storage. System temp dir when unset.
    pub work_root: Option<PathBuf>,
}

impl EngineConfig {
    /// Resolve the FFmpeg binary.
    pub fn locate_binary(&self) -> EncodeResult<PathBuf> {
        match &self.binary {
            Some(path) if path.is_file() => Ok(path.clone()),
            Some(path) => Err(EncodeError::Unavailable(format!(
                "configured ffmpeg binary {} does not exist",
                path.display()
            ))),
            None => which::which("ffmpeg")
                .map_err(|e| EncodeError::Unavailable(format!("ffmpeg not found on PATH: {e}"))),
        }
    }
}

/// FFmpeg run as a subprocess over a private working directory.
pub struct FfmpegEngine {
    binary: PathBuf,
    storage: Mutex<Option<TempDir>>,
}

impl FfmpegEngine {
    /// Locate and probe FFmpeg, then create its working storage.
    pub fn load(config: &EngineConfig) -> EncodeResult<Self> {
        let binary = config.locate_binary()?;
        probe(&binary)?;

        let builder = {
            let mut b = tempfile::Builder::new();
            b.prefix("capsule-encode-");
            b
        };
        let dir = match &config.work_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| EncodeError::Unavailable(format!("cannot create engine storage: {e}")))?;

        info!(binary = %binary.display(), storage = %dir.path().display(), "FFmpeg engine loaded");
        Ok(Self {
            binary,
            storage: Mutex::new(Some(dir)),
        })
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Working directory, or `None` after teardown.
    pub fn storage_path(&self) -> Option<PathBuf> {
        self.storage.lock().as_ref().map(|d| d.path().to_path_buf())
    }

    fn path_of(&self, name: &str) -> EncodeResult<PathBuf> {
        validate_name(name)?;
        let dir = self
            .storage_path()
            .ok_or_else(|| EncodeError::Unavailable("engine has been torn down".into()))?;
        Ok(dir.join(name))
    }
}

fn probe(binary: &Path) -> EncodeResult<()> {
    let status = Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| EncodeError::Unavailable(format!("cannot run {}: {e}", binary.display())))?;
    if !status.success() {
        return Err(EncodeError::Unavailable(format!(
            "{} -version exited with {status}",
            binary.display()
        )));
    }
    Ok(())
}

impl EncodingEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn write_file(&self, name: &str, data: &[u8]) -> EncodeResult<()> {
        let path = self.path_of(name)?;
        std::fs::write(&path, data).map_err(|e| EncodeError::Staging {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    fn read_file(&self, name: &str) -> EncodeResult<Vec<u8>> {
        let path = self.path_of(name)?;
        Ok(std::fs::read(path)?)
    }

    fn unlink(&self, name: &str) -> EncodeResult<()> {
        let path = self.path_of(name)?;
        Ok(std::fs::remove_file(path)?)
    }

    fn run(&self, request: &EncodeRequest, on_progress: &mut dyn FnMut(f32)) -> EncodeResult<()> {
        let dir = self
            .storage_path()
            .ok_or_else(|| EncodeError::Unavailable("engine has been torn down".into()))?;
        debug!(args = ?request.args, "Running ffmpeg");

        let mut command = FfmpegCommand::new_with_path(&self.binary);
        command.args(&request.args);
        command.as_inner_mut().current_dir(&dir);
        let mut child = command
            .spawn()
            .map_err(|e| EncodeError::Failed(format!("failed to spawn ffmpeg: {e}")))?;

        let total = request.expected_frames.max(1) as f32;
        let mut last_error = None;
        let events = child
            .iter()
            .map_err(|e| EncodeError::Failed(format!("cannot read ffmpeg output: {e}")))?;
        for event in events {
            match event {
                FfmpegEvent::Progress(p) => on_progress(p.frame as f32 / total),
                FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, line) => {
                    warn!("ffmpeg: {}", line);
                    last_error = Some(line);
                }
                FfmpegEvent::Error(line) => {
                    debug!("ffmpeg: {}", line);
                    last_error = Some(line);
                }
                _ => {}
            }
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(EncodeError::Failed(match last_error {
                Some(line) => format!("ffmpeg exited with {status}: {line}"),
                None => format!("ffmpeg exited with {status}"),
            }));
        }
        Ok(())
    }

    fn teardown(&self) -> EncodeResult<()> {
        if let Some(dir) = self.storage.lock().take() {
            let path = dir.path().to_path_buf();
            dir.close()?;
            debug!(storage = %path.display(), "Engine storage removed");
        }
        Ok(())
    }
}
