//! Structured job logging.

use tracing::{error, info, warn, Span};
use vcut_models::{JobId, VideoId};

/// Logs job lifecycle events with the job ID, job kind and video ID attached.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
    video_id: Option<String>,
}

impl JobLogger {
    /// Create a new job logger for a specific job and operation.
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
            video_id: None,
        }
    }

    pub fn with_video(mut self, video_id: Option<&VideoId>) -> Self {
        self.video_id = video_id.map(|v| v.to_string());
        self
    }

    fn video(&self) -> &str {
        self.video_id.as_deref().unwrap_or("-")
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            video_id = %self.video(),
            "Job started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            video_id = %self.video(),
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            video_id = %self.video(),
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            video_id = %self.video(),
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            video_id = %self.video(),
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span carrying the same fields, for instrumenting the job future.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation,
            video_id = %self.video()
        )
    }
}
