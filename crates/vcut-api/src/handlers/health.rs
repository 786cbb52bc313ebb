//! Health check handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub redis: String,
    pub version: String,
    pub timestamp: String,
}

/// Pings the state store.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status, redis) = match state.repo.ping().await {
        Ok(()) => (StatusCode::OK, "healthy", "connected"),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "unhealthy", "disconnected")
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            redis: redis.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }),
    )
}
