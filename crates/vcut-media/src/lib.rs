//! FFmpeg CLI wrapper for the cut pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Duration probing through FFprobe
//! - Stream-copy segment cutting and concat-demuxer merging
//! - The `MediaToolkit` seam the worker drives, so tests can swap FFmpeg out
//! - Filesystem helpers for cleanup and the retention sweep

pub mod command;
pub mod config;
pub mod error;
pub mod fs_utils;
pub mod merge;
pub mod probe;
pub mod segment;
pub mod toolkit;

pub use command::{FfmpegCommand, FfmpegRunner};
pub use config::MediaConfig;
pub use error::{MediaError, MediaResult};
pub use fs_utils::{remove_files, sweep_older_than, SweepReport};
pub use merge::{merge_segments, write_concat_manifest};
pub use probe::probe_duration;
pub use segment::{cut_segments, segment_path};
pub use toolkit::{FfmpegToolkit, MediaToolkit};
