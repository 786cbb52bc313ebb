//! Job executor.
//!
//! Each delivery runs under two deadlines. At the soft limit the job's
//! context flag is raised and a warning logged; the body is expected to stop
//! at its next checkpoint. At the hard limit the job future is dropped and
//! the run counts as a failed attempt. Child processes it spawned are not
//! killed and finish on their own.
//!
//! Deliveries are acknowledged only after the body returns. A worker that
//! dies mid-job leaves the delivery pending until another worker claims it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vcut_queue::{Delivery, JobBroker};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::handler::{JobContext, JobHandler};
use crate::hook::FailureHook;
use crate::logging::JobLogger;
use crate::metrics;
use crate::retry::FailureTracker;

/// Deliveries fetched per poll.
const MAX_FETCH: usize = 5;

/// Executes single deliveries and settles them with the broker.
#[derive(Clone)]
pub struct JobRunner {
    broker: Arc<dyn JobBroker>,
    handler: Arc<dyn JobHandler>,
    hook: Arc<dyn FailureHook>,
    soft_time_limit: Duration,
    hard_time_limit: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl JobRunner {
    pub fn new(
        config: &WorkerConfig,
        broker: Arc<dyn JobBroker>,
        handler: Arc<dyn JobHandler>,
        hook: Arc<dyn FailureHook>,
    ) -> Self {
        Self {
            broker,
            handler,
            hook,
            soft_time_limit: config.soft_time_limit,
            hard_time_limit: config.hard_time_limit,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        }
    }

    /// Run the job body under the time limits.
    async fn run_limited(&self, delivery: &Delivery, logger: &JobLogger) -> WorkerResult<()> {
        let job = delivery.job();
        let (soft_tx, soft_rx) = watch::channel(false);
        let ctx = JobContext::new(job.job_id().clone(), delivery.attempt(), soft_rx);

        let work = self.handler.handle(job, &ctx);
        let soft = tokio::time::sleep(self.soft_time_limit);
        let hard = tokio::time::sleep(self.hard_time_limit);
        tokio::pin!(work, soft, hard);

        let mut soft_fired = false;
        loop {
            tokio::select! {
                result = &mut work => return result,
                _ = &mut soft, if !soft_fired => {
                    soft_fired = true;
                    let _ = soft_tx.send(true);
                    logger.log_warning(&format!(
                        "soft time limit of {}s reached",
                        self.soft_time_limit.as_secs()
                    ));
                }
                _ = &mut hard => {
                    logger.log_error(&format!(
                        "hard time limit of {}s reached, abandoning job",
                        self.hard_time_limit.as_secs()
                    ));
                    return Err(WorkerError::HardTimeLimitExceeded(self.hard_time_limit.as_secs()));
                }
            }
        }
    }

    /// Execute one delivery and settle it.
    pub async fn execute(&self, delivery: Delivery) {
        let job = delivery.job();
        let kind = job.kind();
        let logger = JobLogger::new(job.job_id(), kind).with_video(job.video_id());
        logger.log_start(&format!("attempt {}", delivery.attempt() + 1));

        match self.run_limited(&delivery, &logger).await {
            Ok(()) => {
                if let Err(e) = self.broker.ack(&delivery.message_id).await {
                    error!("Failed to ack job {}: {}", job.job_id(), e);
                }
                metrics::record_job_completed(kind);
            }
            Err(e) if !e.is_permanent_failure() && delivery.attempt() < self.max_retries => {
                warn!(
                    "Job {} failed, retrying in {}s (attempt {}/{}): {}",
                    job.job_id(),
                    self.retry_delay.as_secs(),
                    delivery.attempt() + 1,
                    self.max_retries,
                    e
                );
                if let Err(qe) = self.broker.retry_later(&delivery, self.retry_delay).await {
                    error!("Failed to schedule retry for job {}: {}", job.job_id(), qe);
                }
                metrics::record_job_retried(kind);
            }
            Err(e) => {
                if e.is_permanent_failure() {
                    warn!("Job {} failed permanently, not retrying: {}", job.job_id(), e);
                } else {
                    warn!("Job {} exceeded max retries ({})", job.job_id(), self.max_retries);
                }
                self.hook.on_failure(job, &e).await;
                if let Err(qe) = self.broker.dead_letter(&delivery, &e.to_string()).await {
                    error!("Failed to move job {} to DLQ: {}", job.job_id(), qe);
                }
                metrics::record_job_failed(kind);
            }
        }
    }
}

/// Job executor that processes jobs from the queue.
pub struct JobExecutor {
    config: WorkerConfig,
    broker: Arc<dyn JobBroker>,
    runner: JobRunner,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    pub fn new(
        config: WorkerConfig,
        broker: Arc<dyn JobBroker>,
        handler: Arc<dyn JobHandler>,
        hook: Arc<dyn FailureHook>,
    ) -> Self {
        let runner = JobRunner::new(&config, broker.clone(), handler, hook);
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            broker,
            runner,
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    pub fn consumer_name(&self) -> &str {
        &self.consumer_name
    }

    /// Receiver that flips to `true` on shutdown.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Start the executor. Returns after `shutdown` once in-flight jobs
    /// finished or the shutdown timeout passed.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.config.max_concurrent_jobs
        );

        self.broker.init().await?;

        let maintenance = tokio::spawn(Self::maintenance_loop(
            self.broker.clone(),
            self.runner.clone(),
            self.job_semaphore.clone(),
            self.consumer_name.clone(),
            self.config.clone(),
            self.shutdown.subscribe(),
        ));

        let mut shutdown_rx = self.shutdown.subscribe();
        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Shutdown signal received, stopping executor");
                    break;
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        maintenance.abort();

        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!("Shutdown timeout reached with jobs still running; they stay pending for redelivery");
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Fetch as many jobs as there are free slots and spawn them.
    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .broker
            .fetch(&self.consumer_name, available.min(MAX_FETCH), Duration::from_secs(1))
            .await?;

        if jobs.is_empty() {
            return Ok(());
        }
        debug!("Consumed {} jobs from queue", jobs.len());

        for delivery in jobs {
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::job_failed("Semaphore closed"))?;
            let runner = self.runner.clone();

            tokio::spawn(async move {
                let _permit = permit;
                runner.execute(delivery).await;
            });
        }

        Ok(())
    }

    /// Reclaim stalled deliveries and promote due retries.
    async fn maintenance_loop(
        broker: Arc<dyn JobBroker>,
        runner: JobRunner,
        semaphore: Arc<Semaphore>,
        consumer_name: String,
        config: WorkerConfig,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut claim_tick = tokio::time::interval(config.claim_interval);
        let mut promote_tick = tokio::time::interval(config.promote_interval);
        let mut claim_failures = FailureTracker::new(3);
        let mut promote_failures = FailureTracker::new(3);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = promote_tick.tick() => {
                    match broker.promote_due().await {
                        Ok(_) => promote_failures.record_success(),
                        Err(e) => {
                            if promote_failures.record_failure() {
                                warn!("Failed to promote delayed jobs: {}", e);
                            }
                        }
                    }
                }
                _ = claim_tick.tick() => {
                    let free = semaphore.available_permits();
                    if free == 0 {
                        continue;
                    }
                    match broker.reclaim_stalled(&consumer_name, config.claim_min_idle, free).await {
                        Ok(jobs) => {
                            claim_failures.record_success();
                            if !jobs.is_empty() {
                                info!("Claimed {} stalled jobs", jobs.len());
                            }
                            for delivery in jobs {
                                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                                    break;
                                };
                                let runner = runner.clone();
                                tokio::spawn(async move {
                                    let _permit = permit;
                                    runner.execute(delivery).await;
                                });
                            }
                        }
                        Err(e) => {
                            if claim_failures.record_failure() {
                                warn!("Failed to claim pending jobs: {}", e);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        while self.job_semaphore.available_permits() < self.config.max_concurrent_jobs {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
