//! Worker metrics.

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_COMPLETED_TOTAL: &str = "vcut_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vcut_jobs_failed_total";
    pub const JOBS_RETRIED_TOTAL: &str = "vcut_jobs_retried_total";
    pub const RETENTION_FILES_DELETED_TOTAL: &str = "vcut_retention_files_deleted_total";
}

/// Serve Prometheus metrics on `addr` from a background task.
pub fn init_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

pub fn record_job_completed(kind: &str) {
    counter!(names::JOBS_COMPLETED_TOTAL, "kind" => kind.to_string()).increment(1);
}

pub fn record_job_failed(kind: &str) {
    counter!(names::JOBS_FAILED_TOTAL, "kind" => kind.to_string()).increment(1);
}

pub fn record_job_retried(kind: &str) {
    counter!(names::JOBS_RETRIED_TOTAL, "kind" => kind.to_string()).increment(1);
}

pub fn record_files_swept(count: usize) {
    counter!(names::RETENTION_FILES_DELETED_TOTAL).increment(count as u64);
}
