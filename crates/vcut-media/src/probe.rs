//! FFprobe duration probing.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::stderr_tail;
use crate::error::{MediaError, MediaResult};

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe the container duration of a media file in seconds.
///
/// A container without a readable duration yields `0.0`; callers decide
/// whether that is acceptable.
pub async fn probe_duration(ffprobe: &Path, path: &Path) -> MediaResult<f64> {
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let output = Command::new(ffprobe)
        .args(["-v", "error", "-print_format", "json", "-show_format"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MediaError::FfprobeNotFound,
            _ => MediaError::Io(e),
        })?;

    if !output.status.success() {
        return Err(MediaError::ffprobe_failed(
            "FFprobe failed",
            Some(stderr_tail(&output.stderr)),
        ));
    }

    parse_duration(&output.stdout)
}

fn parse_duration(stdout: &[u8]) -> MediaResult<f64> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;
    Ok(probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        let json = br#"{"format": {"filename": "a.mp4", "duration": "125.480000"}}"#;
        assert!((parse_duration(json).unwrap() - 125.48).abs() < 1e-6);
    }

    #[test]
    fn test_missing_or_bad_duration_is_zero() {
        assert_eq!(parse_duration(br#"{"format": {}}"#).unwrap(), 0.0);
        assert_eq!(parse_duration(br#"{"format": {"duration": "N/A"}}"#).unwrap(), 0.0);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(matches!(parse_duration(b"nope"), Err(MediaError::JsonParse(_))));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = probe_duration(Path::new("ffprobe"), Path::new("/nonexistent/video.mp4")).await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
