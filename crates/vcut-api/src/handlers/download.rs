//! Download of the merged output.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};
use vcut_models::VideoId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Stream the merged file as `edited_{id}.mp4`.
///
/// The result record can outlive the file: the retention sweep removes
/// outputs on its own schedule, and that case is a 404 here.
pub async fn download_video(
    State(state): State<AppState>,
    Path(video_id): Path<VideoId>,
) -> ApiResult<Response> {
    let result = state
        .pipeline
        .get_result(&video_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Processed video not found"))?;

    let file = match tokio::fs::File::open(&result.output_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(video_id = %video_id, "Output missing at {}", result.output_path.display());
            return Err(ApiError::not_found("Video file not found"));
        }
        Err(e) => return Err(e.into()),
    };

    info!(video_id = %video_id, "Serving {}", result.output_path.display());
    let body = Body::from_stream(ReaderStream::new(file));
    let headers = [
        (header::CONTENT_TYPE, "video/mp4".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"edited_{}.mp4\"", video_id),
        ),
    ];
    Ok((headers, body).into_response())
}
