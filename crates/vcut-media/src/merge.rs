//! Segment merging with the concat demuxer.

use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::info;

use crate::error::{MediaError, MediaResult};
use crate::fs_utils::remove_files;
use crate::toolkit::MediaToolkit;

/// Write a concat manifest listing `segments` in order.
///
/// The returned path deletes the file when dropped, including when the
/// merge future is dropped mid-flight. Paths are made absolute because the
/// demuxer resolves relative entries against the manifest's own directory.
pub async fn write_concat_manifest(dir: &Path, segments: &[PathBuf]) -> MediaResult<TempPath> {
    tokio::fs::create_dir_all(dir).await?;

    let mut body = String::new();
    for segment in segments {
        let absolute = std::path::absolute(segment)?;
        body.push_str(&format!("file '{}'\n", quote_path(&absolute)));
    }

    let manifest = tempfile::Builder::new()
        .prefix("concat_")
        .suffix(".txt")
        .tempfile_in(dir)?
        .into_temp_path();
    tokio::fs::write(&manifest, body).await?;

    Ok(manifest)
}

/// Escape single quotes for the concat manifest syntax.
fn quote_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

/// Concatenate `segments` into `output`.
///
/// The segments and the manifest are deleted after the attempt whether it
/// succeeds or not.
pub async fn merge_segments(
    toolkit: &dyn MediaToolkit,
    segments: &[PathBuf],
    output: &Path,
) -> MediaResult<()> {
    if segments.is_empty() {
        return Err(MediaError::NoSegments);
    }

    let manifest = match write_concat_manifest(toolkit.manifest_dir(), segments).await {
        Ok(path) => path,
        Err(e) => {
            remove_files(segments).await;
            return Err(e);
        }
    };

    let result = toolkit.concat_segments(&manifest, output).await;

    remove_files(segments).await;
    drop(manifest);

    if result.is_ok() {
        info!("Merged {} segments into {}", segments.len(), output.display());
    }
    result
}
