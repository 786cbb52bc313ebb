//! HTTP API for the video cut pipeline.
//!
//! This crate provides:
//! - `PipelineService`: enqueue ingest/finalize jobs, query status and results
//! - `ChatService` and `SessionAdapter`: multi-turn cut proposals through a
//!   `ConversationEngine` (Gemini in production)
//! - A thin axum router over both, with CORS, request tracing and Prometheus
//!   metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{ChatService, ConversationEngine, GeminiConfig, GeminiEngine, PipelineService, SessionAdapter};
pub use state::AppState;
