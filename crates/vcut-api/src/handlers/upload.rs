//! Video upload.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::info;
use vcut_models::VideoId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub video_id: VideoId,
    pub message: String,
}

/// Store the multipart `video` field as `{uploads}/{id}.{ext}` and queue ingest.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("video") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(ApiError::bad_request("No file selected"));
        }
        let ext = state
            .config
            .accepted_extension(&filename)
            .ok_or_else(|| ApiError::bad_request("Invalid file format"))?;

        let video_id = VideoId::new();
        tokio::fs::create_dir_all(&state.config.upload_folder).await?;
        let path = state.config.upload_folder.join(format!("{}.{}", video_id, ext));

        let mut file = tokio::fs::File::create(&path).await?;
        let mut written = 0usize;
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&path).await;
                    return Err(ApiError::bad_request(format!("Upload interrupted: {}", e)));
                }
            };
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;
        info!(video_id = %video_id, bytes = written, "Video saved to {}", path.display());

        state.pipeline.enqueue_ingest(&video_id, path).await?;

        return Ok(Json(UploadResponse {
            video_id,
            message: "Video uploaded, processing...".to_string(),
        }));
    }

    Err(ApiError::bad_request("No video file in request"))
}
