//! Final cut result.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::status::VideoStatus;
use crate::video::VideoId;

/// Result of a successful finalize job, stored under `video_result:{id}`.
///
/// Written once per finalize run. A second finalize for the same video
/// overwrites it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResultRecord {
    pub video_id: VideoId,
    /// Merged output file
    pub output_path: PathBuf,
    /// Number of validated cuts that went into the output
    pub cuts_count: usize,
    pub status: VideoStatus,
}

impl ResultRecord {
    pub fn completed(video_id: VideoId, output_path: impl Into<PathBuf>, cuts_count: usize) -> Self {
        Self {
            video_id,
            output_path: output_path.into(),
            cuts_count,
            status: VideoStatus::Completed,
        }
    }
}
