//! Broker seam between the orchestrator and the queue backend.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::QueueResult;
use crate::job::{Delivery, JobHandle, QueueJob};

/// Durable queue with explicit acknowledgement.
///
/// A fetched job stays pending until `ack`, `retry_later` or `dead_letter`
/// settles it. Pending jobs whose worker vanished come back through
/// `reclaim_stalled`.
#[async_trait]
pub trait JobBroker: Send + Sync {
    /// Prepare the backend (consumer group etc).
    async fn init(&self) -> QueueResult<()> {
        Ok(())
    }

    /// Enqueue a job for its first attempt.
    async fn submit(&self, job: QueueJob) -> QueueResult<JobHandle>;

    /// Take up to `max` new jobs, waiting at most `block` for one to arrive.
    async fn fetch(&self, consumer: &str, max: usize, block: Duration) -> QueueResult<Vec<Delivery>>;

    /// Settle a finished job.
    async fn ack(&self, message_id: &str) -> QueueResult<()>;

    /// Settle this delivery and schedule the next attempt after `delay`.
    async fn retry_later(&self, delivery: &Delivery, delay: Duration) -> QueueResult<()>;

    /// Settle this delivery by moving it to the dead-letter stream.
    async fn dead_letter(&self, delivery: &Delivery, error: &str) -> QueueResult<()>;

    /// Take over jobs left pending for longer than `min_idle`.
    async fn reclaim_stalled(
        &self,
        consumer: &str,
        min_idle: Duration,
        max: usize,
    ) -> QueueResult<Vec<Delivery>>;

    /// Move scheduled retries that are due back onto the queue.
    /// Returns how many were moved.
    async fn promote_due(&self) -> QueueResult<usize>;
}
