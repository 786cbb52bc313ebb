//! Filesystem helpers for intermediate cleanup and the retention sweep.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, info, warn};

/// Delete files, logging failures. Missing files are ignored.
pub async fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        match fs::remove_file(path).await {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}

/// Outcome of a retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Delete regular files in `dirs` whose modification time is older than `max_age`.
///
/// Subdirectories are left alone. Per-file errors are logged and counted;
/// the sweep carries on. A missing directory is skipped.
pub async fn sweep_older_than(dirs: &[PathBuf], max_age: Duration) -> SweepReport {
    let now = SystemTime::now();
    let mut report = SweepReport::default();

    for dir in dirs {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping {}: {}", dir.display(), e);
                continue;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read entry in {}: {}", dir.display(), e);
                    report.failed += 1;
                    break;
                }
            };

            let path = entry.path();
            match is_expired(&path, now, max_age).await {
                Ok(None) => continue,
                Ok(Some(expired)) => {
                    report.scanned += 1;
                    if !expired {
                        continue;
                    }
                }
                Err(e) => {
                    warn!("Failed to stat {}: {}", path.display(), e);
                    report.failed += 1;
                    continue;
                }
            }

            match fs::remove_file(&path).await {
                Ok(()) => {
                    info!("Deleted expired file {}", path.display());
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!("Failed to delete {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }
    }

    report
}

/// `None` for anything that is not a regular file.
async fn is_expired(path: &Path, now: SystemTime, max_age: Duration) -> std::io::Result<Option<bool>> {
    let metadata = fs::symlink_metadata(path).await?;
    if !metadata.file_type().is_file() {
        return Ok(None);
    }
    let modified = metadata.modified()?;
    // A modification time in the future counts as fresh.
    let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
    Ok(Some(age > max_age))
}
