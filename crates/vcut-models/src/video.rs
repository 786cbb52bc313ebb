//! Video identity and the ingested video record.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::status::VideoStatus;

/// Opaque identifier of an uploaded video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Metadata written by the ingest job once the source has been probed.
///
/// Lives in the state store under `video_info:{id}` and expires with the
/// store TTL; nothing deletes it explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    /// Video ID
    pub id: VideoId,
    /// Uploaded source file
    #[serde(rename = "path")]
    pub source_path: PathBuf,
    /// Probed duration in seconds
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
    /// Status at the time the record was written
    pub status: VideoStatus,
}

impl VideoRecord {
    /// Create a record for a freshly probed video.
    pub fn ready(id: VideoId, source_path: impl Into<PathBuf>, duration_seconds: f64) -> Self {
        Self {
            id,
            source_path: source_path.into(),
            duration_seconds: duration_seconds.max(0.0),
            status: VideoStatus::Ready,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_record_wire_format() {
        let record = VideoRecord::ready(VideoId::from("abc"), "uploads/abc.mp4", 12.5);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], "abc");
        assert_eq!(json["path"], "uploads/abc.mp4");
        assert_eq!(json["duration"], 12.5);
        assert_eq!(json["status"], "ready");
    }

    #[test]
    fn test_negative_duration_is_clamped() {
        let record = VideoRecord::ready(VideoId::new(), "a.mp4", -3.0);
        assert_eq!(record.duration_seconds, 0.0);
    }
}
