//! Processing status.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use vcut_models::{ProcessingStatus, VideoId, VideoStatus};

use crate::error::ApiResult;
use crate::state::AppState;

/// Current status; 404 with a `not_found` body for unknown videos.
pub async fn get_status(
    State(state): State<AppState>,
    Path(video_id): Path<VideoId>,
) -> ApiResult<(StatusCode, Json<ProcessingStatus>)> {
    let status = state.pipeline.query_status(&video_id).await?;
    let code = if status.status == VideoStatus::NotFound {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    Ok((code, Json(status)))
}
