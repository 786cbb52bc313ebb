//! Worker error types.

use thiserror::Error;
use vcut_models::VideoId;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Video info not found for {0}")]
    VideoNotFound(VideoId),

    #[error("No valid cuts found")]
    NoValidCuts,

    #[error("Could not read video duration: {0}")]
    InvalidDuration(String),

    #[error("Soft time limit exceeded")]
    SoftTimeLimitExceeded,

    #[error("Hard time limit of {0}s exceeded")]
    HardTimeLimitExceeded(u64),

    #[error("Media error: {0}")]
    Media(#[from] vcut_media::MediaError),

    #[error("Store error: {0}")]
    Store(#[from] vcut_store::StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] vcut_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    /// Check if this is a permanent failure that should NOT be retried.
    ///
    /// These come from the job's input, so another attempt would see the
    /// same input and fail the same way. Tool and store failures are left
    /// to the retry budget.
    pub fn is_permanent_failure(&self) -> bool {
        matches!(
            self,
            WorkerError::VideoNotFound(_) | WorkerError::NoValidCuts | WorkerError::InvalidDuration(_)
        )
    }
}
