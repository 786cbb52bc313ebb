//! API middleware.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tower_http::cors::{Any, CorsLayer};

use crate::error::{ErrorResponse, ServerErrorDetail};

const HIDDEN_ERROR_DETAIL: &str = "An internal error occurred";

/// Create CORS layer.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        // Wildcard origin - no credentials allowed, can use Any
        return CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any)
            .allow_origin(Any)
            .max_age(Duration::from_secs(600));
    }

    // tower-http panics if credentials are combined with wildcard headers
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE, header::CONTENT_DISPOSITION])
        .allow_credentials(true)
        .allow_origin(origins)
        .max_age(Duration::from_secs(600))
}

/// Don't expose internal error details in production.
///
/// The state is `ApiConfig::is_production`.
pub async fn hide_error_details(State(production): State<bool>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if production && response.extensions().get::<ServerErrorDetail>().is_some() {
        let detail = HIDDEN_ERROR_DETAIL.to_string();
        return (response.status(), Json(ErrorResponse { detail })).into_response();
    }
    response
}
