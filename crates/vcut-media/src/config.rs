//! Media tool configuration.

use std::path::PathBuf;

/// Where to find the FFmpeg tools and where to put transient manifests.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Directory for concat manifests
    pub manifest_dir: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: resolve_tool("ffmpeg"),
            ffprobe_path: resolve_tool("ffprobe"),
            manifest_dir: std::env::temp_dir(),
        }
    }
}

impl MediaConfig {
    /// Load from `FFMPEG_PATH`, `FFPROBE_PATH` and `MEDIA_MANIFEST_DIR`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ffmpeg_path: std::env::var("FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_path),
            ffprobe_path: std::env::var("FFPROBE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffprobe_path),
            manifest_dir: std::env::var("MEDIA_MANIFEST_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.manifest_dir),
        }
    }
}

/// Resolve a tool through PATH, falling back to the bare name.
fn resolve_tool(name: &str) -> PathBuf {
    which::which(name).unwrap_or_else(|_| PathBuf::from(name))
}
