//! Durable job queue for the video cut pipeline.
//!
//! This crate provides:
//! - Job payload types and the `{job, attempt}` envelope
//! - The `JobBroker` seam the worker pulls from
//! - A Redis Streams broker (consumer group, late ack, pending-claim
//!   redelivery, delayed retry set, dead-letter stream)
//! - An in-memory broker for tests

pub mod broker;
pub mod error;
pub mod job;
pub mod memory;
pub mod queue;

pub use broker::JobBroker;
pub use error::{QueueError, QueueResult};
pub use job::{Delivery, FinalizeJob, IngestJob, JobEnvelope, JobHandle, QueueJob, RetentionSweepJob};
pub use memory::{DeadLetter, MemoryBroker};
pub use queue::{JobQueue, QueueConfig};
