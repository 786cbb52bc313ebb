//! Finalize: queue the cut and merge.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use vcut_models::{CutRequest, JobId, VideoId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    #[serde(default)]
    pub video_id: Option<VideoId>,
    #[serde(default)]
    pub cuts: Vec<CutRequest>,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub video_id: VideoId,
    pub task_id: JobId,
    pub message: String,
}

pub async fn finalize(
    State(state): State<AppState>,
    Json(request): Json<FinalizeRequest>,
) -> ApiResult<Json<FinalizeResponse>> {
    let video_id = request
        .video_id
        .filter(|id| !id.as_str().is_empty())
        .ok_or_else(|| ApiError::bad_request("Video ID is required"))?;

    let handle = state.pipeline.enqueue_finalize(&video_id, request.cuts).await?;

    Ok(Json(FinalizeResponse {
        video_id,
        task_id: handle.job_id,
        message: "Video is being processed...".to_string(),
    }))
}
