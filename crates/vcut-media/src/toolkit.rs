//! The media operations a job needs, behind one trait.

use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::config::MediaConfig;
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_duration;

/// Probe, cut and concatenate operations used by the job bodies.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Container duration in seconds; `0.0` when unknown.
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64>;

    /// Stream-copy `duration` seconds of `input` starting at `start` into `output`.
    async fn cut_segment(
        &self,
        input: &Path,
        output: &Path,
        start: f64,
        duration: f64,
    ) -> MediaResult<()>;

    /// Stream-copy the files listed in a concat manifest into `output`.
    async fn concat_segments(&self, manifest: &Path, output: &Path) -> MediaResult<()>;

    /// Directory for transient concat manifests.
    fn manifest_dir(&self) -> &Path;
}

/// `MediaToolkit` backed by the FFmpeg and FFprobe binaries.
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    config: MediaConfig,
    runner: FfmpegRunner,
}

impl FfmpegToolkit {
    pub fn new(config: MediaConfig) -> Self {
        let runner = FfmpegRunner::new(config.ffmpeg_path.clone());
        Self { config, runner }
    }

    /// Check both binaries can be located.
    pub fn check_tools(&self) -> MediaResult<()> {
        which::which(&self.config.ffmpeg_path).map_err(|_| MediaError::FfmpegNotFound)?;
        which::which(&self.config.ffprobe_path).map_err(|_| MediaError::FfprobeNotFound)?;
        Ok(())
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
        probe_duration(&self.config.ffprobe_path, path).await
    }

    async fn cut_segment(
        &self,
        input: &Path,
        output: &Path,
        start: f64,
        duration: f64,
    ) -> MediaResult<()> {
        info!(
            "Cutting segment: {} -> {} (start: {:.2}s, duration: {:.2}s)",
            input.display(),
            output.display(),
            start,
            duration
        );

        let cmd = FfmpegCommand::new(input, output)
            .seek(start)
            .duration(duration)
            .codec_copy()
            .avoid_negative_ts();

        self.runner.run(&cmd).await
    }

    async fn concat_segments(&self, manifest: &Path, output: &Path) -> MediaResult<()> {
        info!("Concatenating segments from {} -> {}", manifest.display(), output.display());

        let cmd = FfmpegCommand::new(manifest, output).concat_input().codec_copy();

        self.runner.run(&cmd).await
    }

    fn manifest_dir(&self) -> &Path {
        &self.config.manifest_dir
    }
}
