//! In-process broker with the same settle semantics as the Redis one.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};

use crate::broker::JobBroker;
use crate::error::QueueResult;
use crate::job::{Delivery, JobEnvelope, JobHandle, QueueJob};

/// A job that ended up on the dead-letter list.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub envelope: JobEnvelope,
    pub error: String,
}

struct Pending {
    envelope: JobEnvelope,
    delivered_at: Instant,
}

#[derive(Default)]
struct State {
    next_id: u64,
    ready: VecDeque<(String, JobEnvelope)>,
    pending: HashMap<String, Pending>,
    delayed: Vec<(Instant, JobEnvelope)>,
    dead: Vec<DeadLetter>,
    submitted: Vec<JobHandle>,
}

impl State {
    fn enqueue(&mut self, envelope: JobEnvelope) -> String {
        self.next_id += 1;
        let message_id = format!("{}-0", self.next_id);
        self.ready.push_back((message_id.clone(), envelope));
        message_id
    }
}

/// `JobBroker` kept in memory, for tests and single-process runs.
#[derive(Default)]
pub struct MemoryBroker {
    state: Mutex<State>,
    notify: Notify,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles returned by `submit`, in submission order.
    pub async fn submitted(&self) -> Vec<JobHandle> {
        self.state.lock().await.submitted.clone()
    }

    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.state.lock().await.dead.clone()
    }

    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn ready_count(&self) -> usize {
        self.state.lock().await.ready.len()
    }

    pub async fn delayed_count(&self) -> usize {
        self.state.lock().await.delayed.len()
    }

    /// Jobs not yet settled in any way.
    pub async fn outstanding(&self) -> usize {
        let state = self.state.lock().await;
        state.ready.len() + state.pending.len() + state.delayed.len()
    }

    fn take_ready(state: &mut State, max: usize) -> Vec<Delivery> {
        let mut out = Vec::new();
        while out.len() < max {
            let Some((message_id, envelope)) = state.ready.pop_front() else {
                break;
            };
            state.pending.insert(
                message_id.clone(),
                Pending {
                    envelope: envelope.clone(),
                    delivered_at: Instant::now(),
                },
            );
            out.push(Delivery {
                message_id,
                envelope,
            });
        }
        out
    }
}

#[async_trait]
impl JobBroker for MemoryBroker {
    async fn submit(&self, job: QueueJob) -> QueueResult<JobHandle> {
        let job_id = job.job_id().clone();
        let mut state = self.state.lock().await;
        let message_id = state.enqueue(JobEnvelope::first(job));
        let handle = JobHandle { job_id, message_id };
        state.submitted.push(handle.clone());
        drop(state);

        self.notify.notify_waiters();
        Ok(handle)
    }

    async fn fetch(&self, _consumer: &str, max: usize, block: Duration) -> QueueResult<Vec<Delivery>> {
        let deadline = tokio::time::Instant::now() + block;
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock().await;
                let out = Self::take_ready(&mut state, max);
                if !out.is_empty() {
                    return Ok(out);
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn ack(&self, message_id: &str) -> QueueResult<()> {
        self.state.lock().await.pending.remove(message_id);
        Ok(())
    }

    async fn retry_later(&self, delivery: &Delivery, delay: Duration) -> QueueResult<()> {
        let mut state = self.state.lock().await;
        state.pending.remove(&delivery.message_id);
        state
            .delayed
            .push((Instant::now() + delay, delivery.envelope.next_attempt()));
        Ok(())
    }

    async fn dead_letter(&self, delivery: &Delivery, error: &str) -> QueueResult<()> {
        let mut state = self.state.lock().await;
        state.pending.remove(&delivery.message_id);
        state.dead.push(DeadLetter {
            envelope: delivery.envelope.clone(),
            error: error.to_string(),
        });
        Ok(())
    }

    async fn reclaim_stalled(
        &self,
        _consumer: &str,
        min_idle: Duration,
        max: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let mut out = Vec::new();

        for (message_id, pending) in state.pending.iter_mut() {
            if out.len() >= max {
                break;
            }
            if now.duration_since(pending.delivered_at) >= min_idle {
                pending.delivered_at = now;
                out.push(Delivery {
                    message_id: message_id.clone(),
                    envelope: pending.envelope.clone(),
                });
            }
        }
        Ok(out)
    }

    async fn promote_due(&self) -> QueueResult<usize> {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        let (due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut state.delayed)
            .into_iter()
            .partition(|(at, _)| *at <= now);
        state.delayed = later;

        let promoted = due.len();
        for (_, envelope) in due {
            state.enqueue(envelope);
        }
        drop(state);

        if promoted > 0 {
            self.notify.notify_waiters();
        }
        Ok(promoted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::RetentionSweepJob;

    fn sweep() -> QueueJob {
        QueueJob::RetentionSweep(RetentionSweepJob::new())
    }

    #[tokio::test]
    async fn test_fetched_job_stays_pending_until_ack() {
        let broker = MemoryBroker::new();
        let handle = broker.submit(sweep()).await.unwrap();

        let jobs = broker.fetch("w1", 10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].message_id, handle.message_id);
        assert_eq!(broker.pending_count().await, 1);

        broker.ack(&handle.message_id).await.unwrap();
        assert_eq!(broker.outstanding().await, 0);
    }

    #[tokio::test]
    async fn test_fetch_times_out_when_empty() {
        let broker = MemoryBroker::new();
        let jobs = broker.fetch("w1", 1, Duration::from_millis(20)).await.unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_wakes_on_submit() {
        let broker = std::sync::Arc::new(MemoryBroker::new());
        let waiter = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.fetch("w1", 1, Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        broker.submit(sweep()).await.unwrap();

        let jobs = waiter.await.unwrap().unwrap();
        assert_eq!(jobs.len(), 1);
    }

    #[tokio::test]
    async fn test_retry_is_delayed_then_promoted_with_next_attempt() {
        let broker = MemoryBroker::new();
        broker.submit(sweep()).await.unwrap();
        let delivery = broker.fetch("w1", 1, Duration::ZERO).await.unwrap().remove(0);

        broker.retry_later(&delivery, Duration::from_millis(30)).await.unwrap();
        assert_eq!(broker.promote_due().await.unwrap(), 0);
        assert_eq!(broker.pending_count().await, 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(broker.promote_due().await.unwrap(), 1);

        let retried = broker.fetch("w1", 1, Duration::ZERO).await.unwrap().remove(0);
        assert_eq!(retried.attempt(), 1);
        assert_ne!(retried.message_id, delivery.message_id);
    }

    #[tokio::test]
    async fn test_stalled_job_is_reclaimed() {
        let broker = MemoryBroker::new();
        broker.submit(sweep()).await.unwrap();
        let delivery = broker.fetch("w1", 1, Duration::ZERO).await.unwrap().remove(0);

        let none = broker.reclaim_stalled("w2", Duration::from_secs(60), 10).await.unwrap();
        assert!(none.is_empty());

        let reclaimed = broker.reclaim_stalled("w2", Duration::ZERO, 10).await.unwrap();
        assert_eq!(reclaimed, vec![delivery]);
    }

    #[tokio::test]
    async fn test_dead_letter_records_error() {
        let broker = MemoryBroker::new();
        broker.submit(sweep()).await.unwrap();
        let delivery = broker.fetch("w1", 1, Duration::ZERO).await.unwrap().remove(0);

        broker.dead_letter(&delivery, "boom").await.unwrap();

        let dead = broker.dead_letters().await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].error, "boom");
        assert_eq!(broker.outstanding().await, 0);
    }
}
