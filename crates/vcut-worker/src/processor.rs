//! Job bodies: ingest, finalize and retention sweep.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use vcut_media::{cut_segments, merge_segments, remove_files, sweep_older_than, MediaError, MediaToolkit};
use vcut_models::{validate_cuts, ProcessingStatus, ResultRecord, VideoRecord};
use vcut_queue::{FinalizeJob, IngestJob, QueueJob, RetentionSweepJob};
use vcut_store::StateRepository;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::handler::{JobContext, JobHandler};
use crate::logging::JobLogger;
use crate::metrics;

/// Runs the pipeline jobs against a state repository and a media toolkit.
#[derive(Clone)]
pub struct VideoProcessor {
    repo: StateRepository,
    media: Arc<dyn MediaToolkit>,
    processed_folder: PathBuf,
    sweep_dirs: Vec<PathBuf>,
    retention_max_age: Duration,
}

impl VideoProcessor {
    pub fn new(repo: StateRepository, media: Arc<dyn MediaToolkit>, config: &WorkerConfig) -> Self {
        Self {
            repo,
            media,
            processed_folder: config.processed_folder.clone(),
            sweep_dirs: vec![config.upload_folder.clone(), config.processed_folder.clone()],
            retention_max_age: config.retention_max_age,
        }
    }

    /// Probe the upload and mark the video ready.
    pub async fn ingest(&self, job: &IngestJob, logger: &JobLogger) -> WorkerResult<()> {
        logger.log_start(&format!("probing {}", job.source_path.display()));

        self.repo
            .put_status(&job.video_id, &ProcessingStatus::processing("Analyzing video..."))
            .await?;

        let duration = self.media.probe_duration(&job.source_path).await?;
        if duration <= 0.0 {
            return Err(WorkerError::InvalidDuration(job.source_path.display().to_string()));
        }

        let record = VideoRecord::ready(job.video_id.clone(), job.source_path.clone(), duration);
        self.repo.put_video(&record).await?;
        self.repo
            .put_status(&job.video_id, &ProcessingStatus::ready("Video ready for editing"))
            .await?;

        logger.log_completion(&format!("duration {:.2}s", duration));
        Ok(())
    }

    /// Cut the validated segments and merge them into one output.
    ///
    /// Intermediate and output names carry the job ID, so two finalize jobs
    /// for the same video never touch each other's files. Their store
    /// writes still race and the last one wins.
    pub async fn finalize(&self, job: &FinalizeJob, ctx: &JobContext, logger: &JobLogger) -> WorkerResult<()> {
        logger.log_start(&format!("{} requested cuts", job.cuts.len()));

        self.repo
            .put_status(&job.video_id, &ProcessingStatus::processing("Cutting video..."))
            .await?;

        let record = self
            .repo
            .get_video(&job.video_id)
            .await?
            .ok_or_else(|| WorkerError::VideoNotFound(job.video_id.clone()))?;

        let cuts = validate_cuts(&job.cuts, record.duration_seconds);
        if cuts.is_empty() {
            return Err(WorkerError::NoValidCuts);
        }
        if cuts.len() < job.cuts.len() {
            logger.log_warning(&format!(
                "dropped {} cuts outside 0..{:.2}s",
                job.cuts.len() - cuts.len(),
                record.duration_seconds
            ));
        }

        let prefix = format!("{}_{}", job.video_id, job.job_id);
        let segments = cut_segments(
            self.media.as_ref(),
            &record.source_path,
            &cuts,
            &self.processed_folder,
            &prefix,
            || ctx.soft_limit_reached(),
        )
        .await
        .map_err(|e| match e {
            MediaError::Cancelled => WorkerError::SoftTimeLimitExceeded,
            other => WorkerError::Media(other),
        })?;
        logger.log_progress(&format!("cut {} segments", segments.len()));

        let merging = ProcessingStatus::processing("Merging segments...");
        if let Err(e) = self.repo.put_status(&job.video_id, &merging).await {
            remove_files(&segments).await;
            return Err(e.into());
        }
        if ctx.soft_limit_reached() {
            remove_files(&segments).await;
            return Err(WorkerError::SoftTimeLimitExceeded);
        }

        let output = self.processed_folder.join(format!("{}_final.mp4", prefix));
        merge_segments(self.media.as_ref(), &segments, &output).await?;

        self.repo
            .put_result(&ResultRecord::completed(job.video_id.clone(), output.clone(), cuts.len()))
            .await?;
        self.repo
            .put_status(&job.video_id, &ProcessingStatus::completed("Video ready!"))
            .await?;

        logger.log_completion(&format!("{} cuts merged into {}", cuts.len(), output.display()));
        Ok(())
    }

    /// Delete expired uploads and outputs. Store records are not touched.
    pub async fn sweep(&self, _job: &RetentionSweepJob, logger: &JobLogger) -> WorkerResult<()> {
        logger.log_start(&format!(
            "removing files older than {}s",
            self.retention_max_age.as_secs()
        ));

        let report = sweep_older_than(&self.sweep_dirs, self.retention_max_age).await;
        metrics::record_files_swept(report.deleted);

        let summary = format!(
            "scanned {}, deleted {}, failed {}",
            report.scanned, report.deleted, report.failed
        );
        if report.failed > 0 {
            logger.log_warning(&summary);
        }
        logger.log_completion(&summary);
        Ok(())
    }
}

#[async_trait]
impl JobHandler for VideoProcessor {
    async fn handle(&self, job: &QueueJob, ctx: &JobContext) -> WorkerResult<()> {
        let logger = JobLogger::new(job.job_id(), job.kind()).with_video(job.video_id());
        let span = logger.create_span();

        let result = async {
            match job {
                QueueJob::Ingest(j) => self.ingest(j, &logger).await,
                QueueJob::Finalize(j) => self.finalize(j, ctx, &logger).await,
                QueueJob::RetentionSweep(j) => self.sweep(j, &logger).await,
            }
        }
        .instrument(span)
        .await;

        if let Err(e) = &result {
            logger.log_error(&e.to_string());
            // Best effort; the failure hook writes the final error status.
            if let Some(video_id) = job.video_id() {
                if let Err(store_err) = self
                    .repo
                    .put_status(video_id, &ProcessingStatus::error(e.to_string()))
                    .await
                {
                    logger.log_warning(&format!("could not record error status: {}", store_err));
                }
            }
        }
        result
    }
}
