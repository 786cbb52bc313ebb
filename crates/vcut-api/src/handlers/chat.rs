//! Chat with the conversation engine.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use vcut_models::VideoId;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: String,
}

/// One chat turn. Caller mistakes get their status code; anything else
/// still answers with an empty cut list.
pub async fn chat(
    State(state): State<AppState>,
    Path(video_id): Path<VideoId>,
    Json(request): Json<ChatRequest>,
) -> Response {
    match state.chat.chat(&video_id, &request.prompt).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) if e.is_client_error() => e.into_response(),
        Err(e) => {
            error!(video_id = %video_id, "Chat failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "cuts": [],
                    "message": "Something went wrong, please try again."
                })),
            )
                .into_response()
        }
    }
}
