//! Periodic retention sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

use vcut_queue::{JobBroker, QueueJob, RetentionSweepJob};

/// Submits a `RetentionSweep` job every `interval`. The first one goes out
/// one interval after start.
pub struct RetentionScheduler {
    broker: Arc<dyn JobBroker>,
    interval: Duration,
}

impl RetentionScheduler {
    pub fn new(broker: Arc<dyn JobBroker>, interval: Duration) -> Self {
        Self { broker, interval }
    }

    /// Run until `shutdown` flips to `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Retention sweep scheduled every {}s", self.interval.as_secs());

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self
                        .broker
                        .submit(QueueJob::RetentionSweep(RetentionSweepJob::new()))
                        .await
                    {
                        Ok(handle) => info!(job_id = %handle.job_id, "Submitted retention sweep"),
                        Err(e) => warn!("Failed to submit retention sweep: {}", e),
                    }
                }
            }
        }
    }
}
