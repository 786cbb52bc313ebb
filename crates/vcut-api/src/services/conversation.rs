//! Conversation session adapter.
//!
//! Threads the exchange log through a `ConversationEngine` and turns raw
//! model text into an `AiReply`. No failure here reaches the caller as an
//! error: parse failures and upstream failures both become a reply with no
//! cuts.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};
use vcut_models::{AiReply, ChatSession, ChatTurn};

/// Message used when the model answered with nothing usable.
pub const UNREADABLE_REPLY_MESSAGE: &str = "Sorry, something went wrong while reading the reply.";
/// Message used when the opening turn could not be sent.
pub const START_FAILED_MESSAGE: &str = "Sorry, the video could not be analyzed. Please try again.";
/// Message used when a follow-up turn could not be sent.
pub const CONTINUE_FAILED_MESSAGE: &str = "Sorry, something went wrong. Please try again.";

/// Errors from the upstream conversation engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine not configured: {0}")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Engine returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Engine returned no text")]
    EmptyResponse,

    #[error("Failed to read video: {0}")]
    Io(#[from] std::io::Error),
}

/// External AI that proposes cuts. Receives the whole log on every call and
/// returns the raw text of the next model turn.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationEngine: Send + Sync {
    async fn generate(&self, log: &[ChatTurn]) -> Result<String, EngineError>;
}

/// Outcome of one chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTurn {
    pub reply: AiReply,
    /// Session to persist. `None` when the engine call failed and the stored
    /// session must stay as it was.
    pub session: Option<ChatSession>,
}

impl SessionTurn {
    fn failed(message: &str) -> Self {
        Self {
            reply: AiReply::fallback(message),
            session: None,
        }
    }
}

#[derive(Clone)]
pub struct SessionAdapter {
    engine: Arc<dyn ConversationEngine>,
}

impl SessionAdapter {
    pub fn new(engine: Arc<dyn ConversationEngine>) -> Self {
        Self { engine }
    }

    /// Open a session with the source video and the first prompt.
    pub async fn start_session(&self, source_path: &Path, prompt: &str) -> SessionTurn {
        let session = ChatSession::opening(source_path, prompt);
        match self.engine.generate(&session.exchange_log).await {
            Ok(raw) => Self::complete(session, raw),
            Err(e) => {
                warn!("Conversation engine failed on opening turn: {}", e);
                SessionTurn::failed(START_FAILED_MESSAGE)
            }
        }
    }

    /// Append the previous model reply and `prompt`, then resend the full log.
    pub async fn continue_session(&self, session: &ChatSession, prompt: &str) -> SessionTurn {
        let mut next = session.clone();
        next.push_follow_up(prompt);

        match self.engine.generate(&next.exchange_log).await {
            Ok(raw) => Self::complete(next, raw),
            Err(e) => {
                warn!(turns = next.turn_count(), "Conversation engine failed on follow-up: {}", e);
                SessionTurn::failed(CONTINUE_FAILED_MESSAGE)
            }
        }
    }

    fn complete(mut session: ChatSession, raw: String) -> SessionTurn {
        let reply = AiReply::parse_or_fallback(&raw, UNREADABLE_REPLY_MESSAGE);
        info!(
            turns = session.turn_count(),
            cuts = reply.cuts.len(),
            "Conversation turn completed"
        );
        session.last_raw_response = Some(raw);
        SessionTurn {
            reply,
            session: Some(session),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::always;
    use vcut_models::{ChatRole, CutRequest};

    const GOOD_REPLY: &str = r#"{"cuts": [{"start": "00:00:05", "end": "00:00:09"}], "message": "Trimmed the intro"}"#;

    fn adapter(engine: MockConversationEngine) -> SessionAdapter {
        SessionAdapter::new(Arc::new(engine))
    }

    #[tokio::test]
    async fn test_start_session_sends_video_turn() {
        let mut engine = MockConversationEngine::new();
        engine
            .expect_generate()
            .withf(|log| {
                log.len() == 1
                    && log[0].role == ChatRole::User
                    && log[0].video.as_deref() == Some(Path::new("uploads/v1.mp4"))
                    && log[0].text == "cut the intro"
            })
            .times(1)
            .returning(|_| Ok(GOOD_REPLY.to_string()));

        let turn = adapter(engine)
            .start_session(Path::new("uploads/v1.mp4"), "cut the intro")
            .await;

        assert_eq!(turn.reply.cuts, vec![CutRequest::new("00:00:05", "00:00:09")]);
        assert_eq!(turn.reply.message, "Trimmed the intro");
        let session = turn.session.unwrap();
        assert_eq!(session.last_raw_response.as_deref(), Some(GOOD_REPLY));
        assert_eq!(session.turn_count(), 1);
    }

    #[tokio::test]
    async fn test_continue_session_resends_full_log() {
        let mut engine = MockConversationEngine::new();
        engine
            .expect_generate()
            .withf(|log| {
                log.len() == 3
                    && log[1].role == ChatRole::Model
                    && log[1].text == "previous raw"
                    && log[2].text == "also the outro"
                    && log[2].video.is_none()
            })
            .times(1)
            .returning(|_| Ok(GOOD_REPLY.to_string()));

        let mut session = ChatSession::opening("uploads/v1.mp4", "cut the intro");
        session.last_raw_response = Some("previous raw".to_string());

        let turn = adapter(engine).continue_session(&session, "also the outro").await;

        let updated = turn.session.unwrap();
        assert_eq!(updated.turn_count(), 3);
        assert_eq!(updated.last_raw_response.as_deref(), Some(GOOD_REPLY));
    }

    #[tokio::test]
    async fn test_unparsable_reply_falls_back_to_raw_text() {
        let mut engine = MockConversationEngine::new();
        engine
            .expect_generate()
            .with(always())
            .returning(|_| Ok("I could not find any scene".to_string()));

        let turn = adapter(engine).start_session(Path::new("v.mp4"), "hi").await;

        assert!(turn.reply.cuts.is_empty());
        assert_eq!(turn.reply.message, "I could not find any scene");
        assert!(turn.session.is_some());
    }

    #[tokio::test]
    async fn test_empty_reply_uses_fallback_message() {
        let mut engine = MockConversationEngine::new();
        engine.expect_generate().returning(|_| Ok("   ".to_string()));

        let turn = adapter(engine).start_session(Path::new("v.mp4"), "hi").await;

        assert_eq!(turn.reply.message, UNREADABLE_REPLY_MESSAGE);
    }

    #[tokio::test]
    async fn test_engine_failure_keeps_session_unchanged() {
        let mut engine = MockConversationEngine::new();
        engine
            .expect_generate()
            .returning(|_| Err(EngineError::Status { status: 503, body: "overloaded".into() }));

        let session = ChatSession::opening("uploads/v1.mp4", "first");
        let turn = adapter(engine).continue_session(&session, "second").await;

        assert_eq!(turn.reply, AiReply::fallback(CONTINUE_FAILED_MESSAGE));
        assert!(turn.session.is_none());
    }

    #[tokio::test]
    async fn test_opening_failure_returns_fallback() {
        let mut engine = MockConversationEngine::new();
        engine
            .expect_generate()
            .returning(|_| Err(EngineError::NotConfigured("GEMINI_API_KEY".into())));

        let turn = adapter(engine).start_session(Path::new("v.mp4"), "hi").await;

        assert_eq!(turn.reply.message, START_FAILED_MESSAGE);
        assert!(turn.session.is_none());
    }
}
