//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(#[from] vcut_store::StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] vcut_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Store(_) | ApiError::Queue(_) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Caller mistakes, as opposed to failures on our side.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub detail: String,
}

/// Response extension marking a body that carries server-side error detail.
///
/// `middleware::hide_error_details` swaps such bodies for a generic message
/// in production.
#[derive(Debug, Clone, Copy)]
pub struct ServerErrorDetail;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if !self.is_client_error() {
            tracing::error!("Request failed: {}", self);
        }

        let mut response = (status, Json(ErrorResponse { detail: self.to_string() })).into_response();
        if status.is_server_error() {
            response.extensions_mut().insert(ServerErrorDetail);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("x").status_code(), StatusCode::CONFLICT);
        let io = ApiError::from(std::io::Error::other("disk full"));
        assert_eq!(io.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!io.is_client_error());
    }

    #[test]
    fn test_only_server_errors_are_marked() {
        let server = ApiError::from(std::io::Error::other("disk full")).into_response();
        assert!(server.extensions().get::<ServerErrorDetail>().is_some());

        let client = ApiError::not_found("Video v not found").into_response();
        assert!(client.extensions().get::<ServerErrorDetail>().is_none());
    }
}
