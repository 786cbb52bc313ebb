//! Chat operations: session persistence around the adapter.

use serde::Serialize;
use tracing::info;
use vcut_models::{ChatSession, CutRequest, VideoId, VideoRecord};
use vcut_store::StateRepository;

use super::conversation::{SessionAdapter, SessionTurn};
use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Body returned by the chat endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub cuts: Vec<CutRequest>,
    pub message: String,
    pub video_duration: f64,
}

#[derive(Clone)]
pub struct ChatService {
    repo: StateRepository,
    adapter: SessionAdapter,
}

impl ChatService {
    pub fn new(repo: StateRepository, adapter: SessionAdapter) -> Self {
        Self { repo, adapter }
    }

    /// Start a session when none is stored for the video, otherwise continue it.
    pub async fn chat(&self, video_id: &VideoId, prompt: &str) -> ApiResult<ChatReply> {
        let video = self.load_video(video_id, prompt).await?;
        match self.repo.get_chat(video_id).await? {
            Some(session) => self.continue_with(&video, &session, prompt).await,
            None => self.start_with(&video, prompt).await,
        }
    }

    /// Open a new session, replacing any stored one.
    pub async fn start_chat(&self, video_id: &VideoId, prompt: &str) -> ApiResult<ChatReply> {
        let video = self.load_video(video_id, prompt).await?;
        self.start_with(&video, prompt).await
    }

    /// Continue the stored session.
    pub async fn continue_chat(&self, video_id: &VideoId, prompt: &str) -> ApiResult<ChatReply> {
        let video = self.load_video(video_id, prompt).await?;
        let session = self
            .repo
            .get_chat(video_id)
            .await?
            .ok_or_else(|| ApiError::conflict(format!("No chat session for video {}", video_id)))?;
        self.continue_with(&video, &session, prompt).await
    }

    async fn load_video(&self, video_id: &VideoId, prompt: &str) -> ApiResult<VideoRecord> {
        if prompt.trim().is_empty() {
            return Err(ApiError::bad_request("Prompt must not be empty"));
        }
        self.repo
            .get_video(video_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Video {} not found", video_id)))
    }

    async fn start_with(&self, video: &VideoRecord, prompt: &str) -> ApiResult<ChatReply> {
        let turn = self.adapter.start_session(&video.source_path, prompt).await;
        self.finish(video, turn).await
    }

    async fn continue_with(
        &self,
        video: &VideoRecord,
        session: &ChatSession,
        prompt: &str,
    ) -> ApiResult<ChatReply> {
        let turn = self.adapter.continue_session(session, prompt).await;
        self.finish(video, turn).await
    }

    async fn finish(&self, video: &VideoRecord, turn: SessionTurn) -> ApiResult<ChatReply> {
        match &turn.session {
            Some(session) => self.repo.put_chat(&video.id, session).await?,
            None => metrics::record_chat_fallback(),
        }

        info!(video_id = %video.id, cuts = turn.reply.cuts.len(), "Chat reply ready");
        Ok(ChatReply {
            cuts: turn.reply.cuts,
            message: turn.reply.message,
            video_duration: video.duration_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::conversation::{EngineError, MockConversationEngine, CONTINUE_FAILED_MESSAGE};
    use std::sync::Arc;
    use std::time::Duration;
    use vcut_store::MemoryStateStore;

    const REPLY: &str = r#"{"cuts": [{"start": "5", "end": "9"}], "message": "Here"}"#;

    async fn service(engine: MockConversationEngine) -> (ChatService, StateRepository, VideoId) {
        let repo = StateRepository::new(Arc::new(MemoryStateStore::new()), Duration::from_secs(3600));
        let id = VideoId::from("v1");
        repo.put_video(&VideoRecord::ready(id.clone(), "uploads/v1.mp4", 42.0))
            .await
            .unwrap();
        let service = ChatService::new(repo.clone(), SessionAdapter::new(Arc::new(engine)));
        (service, repo, id)
    }

    #[tokio::test]
    async fn test_first_chat_starts_and_stores_session() {
        let mut engine = MockConversationEngine::new();
        engine
            .expect_generate()
            .withf(|log| log.len() == 1)
            .times(1)
            .returning(|_| Ok(REPLY.to_string()));
        let (service, repo, id) = service(engine).await;

        let reply = service.chat(&id, "cut it").await.unwrap();

        assert_eq!(reply.cuts, vec![CutRequest::new("5", "9")]);
        assert_eq!(reply.video_duration, 42.0);
        let stored = repo.get_chat(&id).await.unwrap().unwrap();
        assert_eq!(stored.last_raw_response.as_deref(), Some(REPLY));
    }

    #[tokio::test]
    async fn test_second_chat_continues_session() {
        let mut engine = MockConversationEngine::new();
        let mut seq = mockall::Sequence::new();
        engine
            .expect_generate()
            .withf(|log| log.len() == 1)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(REPLY.to_string()));
        engine
            .expect_generate()
            .withf(|log| log.len() == 3 && log[1].text == REPLY)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(REPLY.to_string()));
        let (service, repo, id) = service(engine).await;

        service.chat(&id, "first").await.unwrap();
        service.chat(&id, "second").await.unwrap();

        assert_eq!(repo.get_chat(&id).await.unwrap().unwrap().turn_count(), 3);
    }

    #[tokio::test]
    async fn test_engine_failure_leaves_stored_session_alone() {
        let mut engine = MockConversationEngine::new();
        engine
            .expect_generate()
            .returning(|_| Err(EngineError::Request("timeout".into())));
        let (service, repo, id) = service(engine).await;
        let mut session = ChatSession::opening("uploads/v1.mp4", "first");
        session.last_raw_response = Some("raw".into());
        repo.put_chat(&id, &session).await.unwrap();

        let reply = service.continue_chat(&id, "second").await.unwrap();

        assert!(reply.cuts.is_empty());
        assert_eq!(reply.message, CONTINUE_FAILED_MESSAGE);
        assert_eq!(repo.get_chat(&id).await.unwrap().unwrap(), session);
    }

    #[tokio::test]
    async fn test_empty_prompt_and_unknown_video_are_rejected() {
        let (service, _, id) = service(MockConversationEngine::new()).await;

        let err = service.chat(&id, "  ").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = service.chat(&VideoId::from("ghost"), "hi").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_continue_without_session_is_conflict() {
        let (service, _, id) = service(MockConversationEngine::new()).await;
        let err = service.continue_chat(&id, "hi").await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }
}
