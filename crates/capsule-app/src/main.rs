//! UGC Capsule - photo enhancement and capsule video export
//!
//! Entry point for the command-line front end.

use anyhow::{Context, Result};
use capsule_ai::SourceImage;
use capsule_app::{CapsuleConfig, Session};
use capsule_core::{EnhancementSettings, UpscaleFactor};
use capsule_media::EncoderHandle;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "capsule", version, about = "Enhance UGC photos and export capsule videos")]
struct Cli {
    /// Configuration file (defaults to the user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enhance a batch of images and write the PNGs.
    Enhance {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[command(flatten)]
        settings: SettingsArgs,
        /// Output directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Enhance a batch and render one image into a capsule video.
    Compose {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[command(flatten)]
        settings: SettingsArgs,
        /// Index of the render source within the batch.
        #[arg(long, default_value_t = 0)]
        select: usize,
        /// Output directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Per-run overrides of the configured enhancement settings.
#[derive(Args)]
struct SettingsArgs {
    /// Upscale factor: 1, 2 or 4.
    #[arg(long)]
    upscale: Option<u32>,
    #[arg(long)]
    denoise: Option<f32>,
    #[arg(long)]
    brightness: Option<f32>,
    #[arg(long)]
    saturation: Option<f32>,
    #[arg(long, allow_negative_numbers = true)]
    warmth: Option<f32>,
}

impl SettingsArgs {
    fn resolve(&self, base: &EnhancementSettings) -> Result<EnhancementSettings> {
        let upscale = match self.upscale {
            Some(f) => UpscaleFactor::try_from(f)?,
            None => base.upscale(),
        };
        let settings = EnhancementSettings::new(
            upscale,
            self.denoise.unwrap_or(base.denoise()),
            self.brightness.unwrap_or(base.brightness()),
            self.saturation.unwrap_or(base.saturation()),
            self.warmth.unwrap_or(base.warmth()),
        )?;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = CapsuleConfig::load(cli.config.as_deref())?;
    let encoder = Arc::new(EncoderHandle::ffmpeg(config.engine_config()));
    let session = config.build_session(Arc::clone(&encoder));

    let outcome = match cli.command {
        Command::Enhance {
            images,
            settings,
            out,
        } => {
            let settings = settings.resolve(&config.enhancement)?;
            let out = out.unwrap_or_else(|| config.output_dir.clone());
            enhance(&session, &images, settings, &out).await
        }
        Command::Compose {
            images,
            settings,
            select,
            out,
        } => {
            let settings = settings.resolve(&config.enhancement)?;
            let out = out.unwrap_or_else(|| config.output_dir.clone());
            compose(&session, &images, settings, select, &out).await
        }
    };

    session.reset();
    if let Err(e) = encoder.teardown() {
        warn!(error = %e, "Encoder teardown failed");
    }
    outcome
}

fn read_sources(paths: &[PathBuf]) -> Result<Vec<SourceImage>> {
    paths
        .iter()
        .map(|p| SourceImage::from_path(p).with_context(|| format!("reading {}", p.display())))
        .collect()
}

async fn enhance(
    session: &Session,
    images: &[PathBuf],
    settings: EnhancementSettings,
    out: &Path,
) -> Result<()> {
    let batch = session.enhance(read_sources(images)?, settings).await?;
    for item in batch.items() {
        info!(
            source = %item.source.name,
            width = item.width,
            height = item.height,
            labels = ?item.labels,
            "Enhanced"
        );
    }

    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    for (name, png) in batch.export_pngs()? {
        let path = out.join(name);
        std::fs::write(&path, png).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "Image written");
    }
    Ok(())
}

async fn compose(
    session: &Session,
    images: &[PathBuf],
    settings: EnhancementSettings,
    select: usize,
    out: &Path,
) -> Result<()> {
    session.enhance(read_sources(images)?, settings).await?;
    let source = session.select(select)?;
    for line in source.narrative_lines() {
        info!(line, "Caption");
    }

    let mut rx = session.subscribe_video();
    let watcher = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            info!(
                state = state.name(),
                progress = %format!("{:.0}%", state.progress() * 100.0),
                "Video"
            );
        }
    });

    let result = session.compose_selected().await;
    watcher.abort();
    let artifact = result?;

    let path = artifact.write_to(out)?;
    info!(path = %path.display(), bytes = artifact.len(), "Video written");
    Ok(())
}
