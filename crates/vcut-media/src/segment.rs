//! Segment cutting.
//!
//! Segments are cut with stream copy, so a cut can only start on a keyframe.
//! The first frames of a segment may come from slightly before the requested
//! start. This is a known precision limit of copy mode.

use std::path::{Path, PathBuf};
use tracing::{info, warn};
use vcut_models::ValidatedCut;

use crate::error::{MediaError, MediaResult};
use crate::fs_utils::remove_files;
use crate::toolkit::MediaToolkit;

/// Path of segment `index` for a given file name prefix.
pub fn segment_path(dir: &Path, prefix: &str, index: usize) -> PathBuf {
    dir.join(format!("{}_segment_{}.mp4", prefix, index))
}

/// Cut one segment per validated cut, in order.
///
/// `should_abort` is checked before each cut. On any failure or abort every
/// segment already produced by this call is deleted before the error is
/// returned.
pub async fn cut_segments<F>(
    toolkit: &dyn MediaToolkit,
    source: &Path,
    cuts: &[ValidatedCut],
    out_dir: &Path,
    prefix: &str,
    should_abort: F,
) -> MediaResult<Vec<PathBuf>>
where
    F: Fn() -> bool,
{
    tokio::fs::create_dir_all(out_dir).await?;

    let mut produced = Vec::with_capacity(cuts.len());

    for (i, cut) in cuts.iter().enumerate() {
        if should_abort() {
            warn!("Segment cutting aborted before segment {}", i);
            remove_files(&produced).await;
            return Err(MediaError::Cancelled);
        }

        let output = segment_path(out_dir, prefix, i);
        if let Err(e) = toolkit
            .cut_segment(source, &output, cut.start_seconds, cut.duration_seconds())
            .await
        {
            warn!("Segment {} failed, removing {} earlier segments: {}", i, produced.len(), e);
            // A failed cut may still leave a partial file behind.
            produced.push(output);
            remove_files(&produced).await;
            return Err(e);
        }
        produced.push(output);
    }

    info!("Cut {} segments from {}", produced.len(), source.display());
    Ok(produced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Writes a marker file per cut and fails on the configured call.
    struct FlakyToolkit {
        fail_on: Option<usize>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MediaToolkit for FlakyToolkit {
        async fn probe_duration(&self, _path: &Path) -> MediaResult<f64> {
            Ok(60.0)
        }

        async fn cut_segment(&self, _input: &Path, output: &Path, start: f64, _duration: f64) -> MediaResult<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(call) == self.fail_on {
                return Err(MediaError::ffmpeg_failed("boom", None, Some(1)));
            }
            tokio::fs::write(output, format!("{start}")).await?;
            Ok(())
        }

        async fn concat_segments(&self, _manifest: &Path, _output: &Path) -> MediaResult<()> {
            Ok(())
        }

        fn manifest_dir(&self) -> &Path {
            Path::new("/tmp")
        }
    }

    fn cuts() -> Vec<ValidatedCut> {
        (0..3)
            .map(|i| ValidatedCut {
                start: i.to_string(),
                end: (i + 1).to_string(),
                start_seconds: i as f64,
                end_seconds: (i + 1) as f64,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_cuts_in_order() {
        let dir = TempDir::new().unwrap();
        let toolkit = FlakyToolkit { fail_on: None, calls: AtomicUsize::new(0) };

        let segments = cut_segments(&toolkit, Path::new("src.mp4"), &cuts(), dir.path(), "v_j", || false)
            .await
            .unwrap();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1], dir.path().join("v_j_segment_1.mp4"));
        assert_eq!(tokio::fs::read_to_string(&segments[2]).await.unwrap(), "2");
    }

    #[tokio::test]
    async fn test_failure_removes_earlier_segments() {
        let dir = TempDir::new().unwrap();
        let toolkit = FlakyToolkit { fail_on: Some(1), calls: AtomicUsize::new(0) };

        let result = cut_segments(&toolkit, Path::new("src.mp4"), &cuts(), dir.path(), "v_j", || false).await;

        assert!(matches!(result, Err(MediaError::FfmpegFailed { .. })));
        assert!(!segment_path(dir.path(), "v_j", 0).exists());
        assert!(!segment_path(dir.path(), "v_j", 2).exists());
    }

    #[tokio::test]
    async fn test_abort_removes_segments() {
        let dir = TempDir::new().unwrap();
        let toolkit = FlakyToolkit { fail_on: None, calls: AtomicUsize::new(0) };

        let result = cut_segments(&toolkit, Path::new("src.mp4"), &cuts(), dir.path(), "v_j", || {
            toolkit.calls.load(Ordering::SeqCst) >= 2
        })
        .await;

        assert!(matches!(result, Err(MediaError::Cancelled)));
        assert!(!segment_path(dir.path(), "v_j", 0).exists());
        assert!(!segment_path(dir.path(), "v_j", 1).exists());
    }
}
