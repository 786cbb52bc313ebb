//! Shared data models for the video cut pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Video records, processing status and final results
//! - Cut requests and the cut validator
//! - Chat sessions and the AI reply schema
//! - Timestamp parsing

pub mod chat;
pub mod cut;
pub mod job;
pub mod result;
pub mod status;
pub mod timestamp;
pub mod video;

// Re-export common types
pub use chat::{AiReply, ChatRole, ChatSession, ChatTurn, ReplyParseError};
pub use cut::{validate_cuts, CutRequest, ValidatedCut};
pub use job::JobId;
pub use result::ResultRecord;
pub use status::{ProcessingStatus, VideoStatus};
pub use timestamp::{parse_timestamp, timestamp_to_seconds, TimestampError};
pub use video::{VideoId, VideoRecord};
