//! Job body seam.

use async_trait::async_trait;
use tokio::sync::watch;
use vcut_models::JobId;
use vcut_queue::QueueJob;

use crate::error::WorkerResult;

/// Per-run context handed to a job body.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: JobId,
    /// Zero on the first run
    pub attempt: u32,
    soft_limit: watch::Receiver<bool>,
}

impl JobContext {
    pub fn new(job_id: JobId, attempt: u32, soft_limit: watch::Receiver<bool>) -> Self {
        Self {
            job_id,
            attempt,
            soft_limit,
        }
    }

    /// Whether the soft time limit has passed. Bodies check this between
    /// steps and bail out with cleanup when it is set.
    pub fn soft_limit_reached(&self) -> bool {
        *self.soft_limit.borrow()
    }
}

/// Runs one job to completion.
///
/// Bodies must be safe to run again from scratch: a redelivered job finds
/// whatever a previous attempt left on disk and overwrites it.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &QueueJob, ctx: &JobContext) -> WorkerResult<()>;
}
