//! Video processing status.
//!
//! Lifecycle of a video:
//!
//! ```text
//! processing -> ready                      (ingest succeeded)
//! processing -> error                      (ingest failed)
//! ready -> processing -> completed         (finalize succeeded)
//! ready -> processing -> error             (finalize failed)
//! ```
//!
//! Transitions are not guarded at write time. Any job may overwrite any
//! prior status; ordering comes from the order jobs run in.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a video in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// A job is working on the video
    Processing,
    /// Ingest finished, the video can be chatted about and finalized
    Ready,
    /// Finalize produced the merged output
    Completed,
    /// The last job failed
    Error,
    /// Neither a status nor a video record exists. Derived on read, never stored.
    NotFound,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Processing => "processing",
            VideoStatus::Ready => "ready",
            VideoStatus::Completed => "completed",
            VideoStatus::Error => "error",
            VideoStatus::NotFound => "not_found",
        }
    }

    /// Check if no job is expected to move this status any further.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Completed | VideoStatus::Error)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status snapshot stored under `video_status:{id}`.
///
/// Every transition overwrites the whole value; the last writer wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessingStatus {
    pub status: VideoStatus,
    #[serde(default)]
    pub message: String,
}

impl ProcessingStatus {
    pub fn new(status: VideoStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::new(VideoStatus::Processing, message)
    }

    pub fn ready(message: impl Into<String>) -> Self {
        Self::new(VideoStatus::Ready, message)
    }

    pub fn completed(message: impl Into<String>) -> Self {
        Self::new(VideoStatus::Completed, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(VideoStatus::Error, message)
    }

    pub fn not_found() -> Self {
        Self::new(VideoStatus::NotFound, "Video not found")
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        let status = ProcessingStatus::not_found();
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"not_found\""));

        let parsed: ProcessingStatus =
            serde_json::from_str(r#"{"status":"ready","message":"Video ready"}"#).unwrap();
        assert_eq!(parsed.status, VideoStatus::Ready);
    }

    #[test]
    fn test_missing_message_defaults_to_empty() {
        let parsed: ProcessingStatus = serde_json::from_str(r#"{"status":"error"}"#).unwrap();
        assert_eq!(parsed.message, "");
        assert!(parsed.is_terminal());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!VideoStatus::Processing.is_terminal());
        assert!(!VideoStatus::Ready.is_terminal());
        assert!(VideoStatus::Completed.is_terminal());
        assert!(VideoStatus::Error.is_terminal());
    }
}
