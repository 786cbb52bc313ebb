//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{chat, download_video, finalize, get_status, health, upload_video};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, hide_error_details};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let api_routes = Router::new()
        .route("/upload", post(upload_video))
        .route("/chat/:video_id", post(chat))
        .route("/status/:video_id", get(get_status))
        .route("/finalize", post(finalize))
        .route("/download/:video_id", get(download_video))
        .route("/health", get(health));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let max_body_size = state.config.max_body_size;

    Router::new()
        .nest("/api", api_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn_with_state(
            state.config.is_production(),
            hide_error_details,
        ))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
