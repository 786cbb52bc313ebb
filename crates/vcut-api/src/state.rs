//! Application state.

use std::sync::Arc;

use tracing::warn;
use vcut_queue::{JobBroker, JobQueue};
use vcut_store::{RedisStateStore, StateRepository, StoreConfig};

use crate::config::ApiConfig;
use crate::services::{
    ChatService, ConversationEngine, GeminiConfig, GeminiEngine, PipelineService, SessionAdapter,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub repo: StateRepository,
    pub pipeline: PipelineService,
    pub chat: ChatService,
}

impl AppState {
    /// Create application state backed by Redis and Gemini.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store_config = StoreConfig::from_env();
        let store = RedisStateStore::new(&store_config)?;
        let repo = StateRepository::with_config(Arc::new(store), &store_config);

        let queue = JobQueue::from_env()?;
        queue.init().await?;

        let engine = GeminiEngine::new(GeminiConfig::from_env())?;
        if !engine.is_configured() {
            warn!("GEMINI_API_KEY not set; chat will answer with fallback replies");
        }

        Ok(Self::from_parts(config, repo, Arc::new(queue), Arc::new(engine)))
    }

    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        config: ApiConfig,
        repo: StateRepository,
        broker: Arc<dyn JobBroker>,
        engine: Arc<dyn ConversationEngine>,
    ) -> Self {
        Self {
            pipeline: PipelineService::new(repo.clone(), broker),
            chat: ChatService::new(repo.clone(), SessionAdapter::new(engine)),
            repo,
            config,
        }
    }
}
