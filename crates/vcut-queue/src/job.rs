//! Job types for the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vcut_models::{CutRequest, JobId, VideoId};

/// Probe an uploaded file and record it as ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestJob {
    /// Unique job ID
    pub job_id: JobId,
    pub video_id: VideoId,
    /// Uploaded source file
    pub source_path: PathBuf,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl IngestJob {
    pub fn new(video_id: VideoId, source_path: impl Into<PathBuf>) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            source_path: source_path.into(),
            created_at: Utc::now(),
        }
    }
}

/// Cut and merge a video according to a cut list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeJob {
    /// Unique job ID
    pub job_id: JobId,
    pub video_id: VideoId,
    /// Cuts as submitted; validated when the job runs
    pub cuts: Vec<CutRequest>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl FinalizeJob {
    pub fn new(video_id: VideoId, cuts: Vec<CutRequest>) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            cuts,
            created_at: Utc::now(),
        }
    }
}

/// Delete expired files from the upload and output folders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionSweepJob {
    /// Unique job ID
    pub job_id: JobId,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl RetentionSweepJob {
    pub fn new() -> Self {
        Self {
            job_id: JobId::new(),
            created_at: Utc::now(),
        }
    }
}

impl Default for RetentionSweepJob {
    fn default() -> Self {
        Self::new()
    }
}

/// Generic job wrapper for queue storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueJob {
    Ingest(IngestJob),
    Finalize(FinalizeJob),
    RetentionSweep(RetentionSweepJob),
}

impl QueueJob {
    pub fn job_id(&self) -> &JobId {
        match self {
            QueueJob::Ingest(j) => &j.job_id,
            QueueJob::Finalize(j) => &j.job_id,
            QueueJob::RetentionSweep(j) => &j.job_id,
        }
    }

    /// Video the job works on. The retention sweep has none.
    pub fn video_id(&self) -> Option<&VideoId> {
        match self {
            QueueJob::Ingest(j) => Some(&j.video_id),
            QueueJob::Finalize(j) => Some(&j.video_id),
            QueueJob::RetentionSweep(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            QueueJob::Ingest(_) => "ingest",
            QueueJob::Finalize(_) => "finalize",
            QueueJob::RetentionSweep(_) => "retention_sweep",
        }
    }
}

/// What is actually stored on the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub job: QueueJob,
    /// Zero for the first run, incremented on every scheduled retry
    #[serde(default)]
    pub attempt: u32,
}

impl JobEnvelope {
    pub fn first(job: QueueJob) -> Self {
        Self { job, attempt: 0 }
    }

    /// Same job, one attempt later.
    pub fn next_attempt(&self) -> Self {
        Self {
            job: self.job.clone(),
            attempt: self.attempt + 1,
        }
    }
}

/// Returned by `submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: JobId,
    /// Stream entry ID
    pub message_id: String,
}

/// A job handed to a worker. It stays pending until acked.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub message_id: String,
    pub envelope: JobEnvelope,
}

impl Delivery {
    pub fn job(&self) -> &QueueJob {
        &self.envelope.job
    }

    pub fn attempt(&self) -> u32 {
        self.envelope.attempt
    }
}
