//! Conversation session state and AI reply parsing.

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;

use crate::cut::CutRequest;

/// Fenced JSON block. A missing closing fence runs to the end of the text.
static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*(?:```|\z)").expect("valid fence regex"));

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One turn in the exchange log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
    /// Source video attached to this turn. Only the opening user turn has one;
    /// the bytes are re-read from this path every time the log is sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<PathBuf>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            video: None,
        }
    }

    pub fn user_with_video(text: impl Into<String>, video: impl Into<PathBuf>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            video: Some(video.into()),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
            video: None,
        }
    }
}

/// Conversation state persisted under `chat_history:{id}`.
///
/// The full log is resent on every turn, so it grows for as long as the
/// session lives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChatSession {
    pub exchange_log: Vec<ChatTurn>,
    /// Unparsed text of the most recent model reply
    #[serde(default)]
    pub last_raw_response: Option<String>,
}

impl ChatSession {
    /// Session whose log holds only the opening turn (video + prompt).
    pub fn opening(source_path: impl Into<PathBuf>, prompt: impl Into<String>) -> Self {
        Self {
            exchange_log: vec![ChatTurn::user_with_video(prompt, source_path)],
            last_raw_response: None,
        }
    }

    /// Append the previous raw model reply and the next user prompt.
    pub fn push_follow_up(&mut self, prompt: impl Into<String>) {
        if let Some(previous) = self.last_raw_response.take() {
            self.exchange_log.push(ChatTurn::model(previous));
        }
        self.exchange_log.push(ChatTurn::user(prompt));
    }

    pub fn turn_count(&self) -> usize {
        self.exchange_log.len()
    }
}

/// Why a model reply could not be read as a structured reply.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplyParseError {
    #[error("reply is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("reply is not a JSON object")]
    NotAnObject,

    #[error("reply is missing the '{0}' field")]
    MissingField(&'static str),
}

/// Structured reply returned to the chat caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AiReply {
    pub cuts: Vec<CutRequest>,
    pub message: String,
}

impl AiReply {
    /// Reply with no cuts.
    pub fn fallback(message: impl Into<String>) -> Self {
        Self {
            cuts: Vec::new(),
            message: message.into(),
        }
    }

    /// Parse a raw model reply.
    ///
    /// The JSON object is taken from a ```` ```json ```` fenced block when one
    /// is present, otherwise from the whole text. Both `cuts` and `message`
    /// must be present. A `cuts` value that is not an array becomes empty and
    /// array elements without both `start` and `end` are dropped.
    pub fn parse(raw: &str) -> Result<Self, ReplyParseError> {
        let json_text = match JSON_FENCE.captures(raw) {
            Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
            None => raw.trim(),
        };

        let value: Value = serde_json::from_str(json_text)
            .map_err(|e| ReplyParseError::InvalidJson(e.to_string()))?;
        let object = value.as_object().ok_or(ReplyParseError::NotAnObject)?;

        let cuts_value = object.get("cuts").ok_or(ReplyParseError::MissingField("cuts"))?;
        let message_value = object
            .get("message")
            .ok_or(ReplyParseError::MissingField("message"))?;

        let cuts = match cuts_value {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| {
                    let cut = item.as_object()?;
                    Some(CutRequest::new(
                        timestamp_text(cut.get("start")?),
                        timestamp_text(cut.get("end")?),
                    ))
                })
                .collect(),
            _ => Vec::new(),
        };

        let message = match message_value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        Ok(Self { cuts, message })
    }

    /// Parse `raw`, falling back to the raw text itself as the message, or
    /// to `fallback_text` when the reply was empty.
    pub fn parse_or_fallback(raw: &str, fallback_text: &str) -> Self {
        match Self::parse(raw) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "Could not parse model reply, returning raw text");
                if raw.trim().is_empty() {
                    Self::fallback(fallback_text)
                } else {
                    Self::fallback(raw)
                }
            }
        }
    }
}

/// Timestamps sometimes arrive as numbers.
fn timestamp_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
