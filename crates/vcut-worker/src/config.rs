//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use vcut_queue::QueueConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// After this the job is told to wrap up
    pub soft_time_limit: Duration,
    /// After this the job is abandoned
    pub hard_time_limit: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before a failed job is retried
    pub retry_delay: Duration,
    /// How often the worker should scan for orphaned pending jobs
    pub claim_interval: Duration,
    /// Minimum idle time before a pending job can be claimed (crash recovery).
    /// Must exceed the hard limit or live jobs get stolen.
    pub claim_min_idle: Duration,
    /// How often due retries are moved back onto the stream
    pub promote_interval: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Uploaded source files
    pub upload_folder: PathBuf,
    /// Segments and merged outputs
    pub processed_folder: PathBuf,
    /// How often a retention sweep is submitted
    pub retention_interval: Duration,
    /// Files older than this are swept
    pub retention_max_age: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let hard_time_limit = Duration::from_secs(3600);
        Self {
            max_concurrent_jobs: 2,
            soft_time_limit: Duration::from_secs(1800),
            hard_time_limit,
            max_retries: 3,
            retry_delay: Duration::from_secs(60),
            claim_interval: Duration::from_secs(30),
            claim_min_idle: hard_time_limit + Duration::from_secs(300),
            promote_interval: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(60),
            upload_folder: PathBuf::from("uploads"),
            processed_folder: PathBuf::from("processed"),
            retention_interval: Duration::from_secs(86400),
            retention_max_age: Duration::from_secs(86400),
        }
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}

/// Like `env_secs`, but a zero period is ignored. Interval timers panic on zero.
fn env_period(name: &str) -> Option<Duration> {
    env_secs(name).filter(|d| !d.is_zero())
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// Retry settings are shared with the queue (`QUEUE_MAX_RETRIES`,
    /// `QUEUE_RETRY_DELAY_SECS`).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let queue = QueueConfig::from_env();
        let hard_time_limit = env_secs("WORKER_HARD_TIME_LIMIT").unwrap_or(defaults.hard_time_limit);

        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            soft_time_limit: env_secs("WORKER_SOFT_TIME_LIMIT").unwrap_or(defaults.soft_time_limit),
            hard_time_limit,
            max_retries: queue.max_retries,
            retry_delay: queue.retry_delay,
            claim_interval: env_period("WORKER_CLAIM_INTERVAL_SECS").unwrap_or(defaults.claim_interval),
            claim_min_idle: env_secs("WORKER_CLAIM_MIN_IDLE_SECS")
                .unwrap_or(hard_time_limit + Duration::from_secs(300)),
            promote_interval: defaults.promote_interval,
            shutdown_timeout: env_secs("WORKER_SHUTDOWN_TIMEOUT").unwrap_or(defaults.shutdown_timeout),
            upload_folder: std::env::var("UPLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_folder),
            processed_folder: std::env::var("PROCESSED_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(defaults.processed_folder),
            retention_interval: env_period("RETENTION_INTERVAL_SECS")
                .unwrap_or(defaults.retention_interval),
            retention_max_age: env_secs("RETENTION_MAX_AGE_SECS").unwrap_or(defaults.retention_max_age),
        }
    }
}
