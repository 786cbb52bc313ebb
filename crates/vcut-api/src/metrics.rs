//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "vcut_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vcut_http_request_duration_seconds";
    pub const JOBS_ENQUEUED_TOTAL: &str = "vcut_jobs_enqueued_total";
    pub const CHAT_FALLBACKS_TOTAL: &str = "vcut_chat_fallbacks_total";
}

static ID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(/api/(?:chat|status|download))/[^/]+").expect("valid id regex")
});

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record job enqueued.
pub fn record_job_enqueued(kind: &str) {
    counter!(names::JOBS_ENQUEUED_TOTAL, "kind" => kind.to_string()).increment(1);
}

/// Record a chat turn answered with the fallback reply.
pub fn record_chat_fallback() {
    counter!(names::CHAT_FALLBACKS_TOTAL).increment(1);
}

/// Replace video IDs in paths so labels stay bounded.
fn sanitize_path(path: &str) -> String {
    ID_SEGMENT.replace(path, "$1/:video_id").into_owned()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/api/status/3f2a-11"), "/api/status/:video_id");
        assert_eq!(sanitize_path("/api/chat/abc"), "/api/chat/:video_id");
        assert_eq!(sanitize_path("/api/finalize"), "/api/finalize");
        assert_eq!(sanitize_path("/metrics"), "/metrics");
    }
}
