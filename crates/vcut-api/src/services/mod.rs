//! Business logic services.

pub mod chat;
pub mod conversation;
pub mod gemini;
pub mod pipeline;

pub use chat::{ChatReply, ChatService};
pub use conversation::{ConversationEngine, EngineError, SessionAdapter, SessionTurn};
pub use gemini::{GeminiConfig, GeminiEngine};
pub use pipeline::PipelineService;
