//! Terminal failure hook.

use async_trait::async_trait;
use tracing::{error, info};
use vcut_models::ProcessingStatus;
use vcut_queue::QueueJob;
use vcut_store::StateRepository;

use crate::error::WorkerError;
use crate::retry::{retry_async, RetryConfig};

/// Called once when a job fails for good, before it is dead-lettered.
#[async_trait]
pub trait FailureHook: Send + Sync {
    async fn on_failure(&self, job: &QueueJob, error: &WorkerError);
}

/// Writes `status=error` with the error text for the job's video.
#[derive(Clone)]
pub struct StatusFailureHook {
    repo: StateRepository,
    retry: RetryConfig,
}

impl StatusFailureHook {
    pub fn new(repo: StateRepository) -> Self {
        Self {
            repo,
            retry: RetryConfig::new("failure_status_write"),
        }
    }
}

#[async_trait]
impl FailureHook for StatusFailureHook {
    async fn on_failure(&self, job: &QueueJob, err: &WorkerError) {
        let Some(video_id) = job.video_id() else {
            info!(job_id = %job.job_id(), "No video to mark as failed");
            return;
        };

        let status = ProcessingStatus::error(err.to_string());
        let result = retry_async(&self.retry, || self.repo.put_status(video_id, &status)).await;

        if let Err(e) = result {
            error!(
                job_id = %job.job_id(),
                video_id = %video_id,
                "Failed to record error status: {}", e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use vcut_models::{VideoId, VideoStatus};
    use vcut_queue::{FinalizeJob, RetentionSweepJob};
    use vcut_store::MemoryStateStore;

    #[tokio::test]
    async fn test_writes_error_status_with_message() {
        let repo = StateRepository::new(Arc::new(MemoryStateStore::new()), Duration::from_secs(60));
        let hook = StatusFailureHook::new(repo.clone());
        let job = QueueJob::Finalize(FinalizeJob::new(VideoId::from("v1"), vec![]));

        hook.on_failure(&job, &WorkerError::NoValidCuts).await;

        let status = repo.get_status(&VideoId::from("v1")).await.unwrap().unwrap();
        assert_eq!(status.status, VideoStatus::Error);
        assert_eq!(status.message, "No valid cuts found");
    }

    #[tokio::test]
    async fn test_jobs_without_video_are_ignored() {
        let store = Arc::new(MemoryStateStore::new());
        let repo = StateRepository::new(store.clone(), Duration::from_secs(60));
        let hook = StatusFailureHook::new(repo);

        hook.on_failure(
            &QueueJob::RetentionSweep(RetentionSweepJob::new()),
            &WorkerError::job_failed("x"),
        )
        .await;

        assert!(store.is_empty().await);
    }
}
