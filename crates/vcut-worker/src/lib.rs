//! Job orchestrator and worker for the video cut pipeline.
//!
//! This crate provides:
//! - `JobExecutor`: pulls jobs from a `JobBroker`, enforces the soft and hard
//!   time limits, settles each delivery (ack, delayed retry or dead letter)
//! - `VideoProcessor`: the ingest, finalize and retention sweep job bodies
//! - `StatusFailureHook`: writes `status=error` when a job fails for good
//! - `RetentionScheduler`: submits the periodic sweep
//! - Structured job logging and graceful shutdown

pub mod config;
pub mod error;
pub mod executor;
pub mod handler;
pub mod hook;
pub mod logging;
pub mod metrics;
pub mod processor;
pub mod retry;
pub mod scheduler;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{JobExecutor, JobRunner};
pub use handler::{JobContext, JobHandler};
pub use hook::{FailureHook, StatusFailureHook};
pub use logging::JobLogger;
pub use processor::VideoProcessor;
pub use scheduler::RetentionScheduler;
