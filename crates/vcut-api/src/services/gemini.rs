//! Gemini `generateContent` client used as the conversation engine.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vcut_models::{ChatRole, ChatTurn};

use super::conversation::{ConversationEngine, EngineError};

const SYSTEM_PROMPT: &str = "You are 'Clip Assistant', an expert video editor. Your job is to \
understand the user's instructions and pick the moments to cut from the provided video. Always \
answer with a single JSON object with two keys: 1. \"cuts\": an array of timestamp ranges, for \
example [{\"start\": \"00:01:15\", \"end\": \"00:01:25\"}]. 2. \"message\": a friendly message \
for the user. If the instruction makes no sense or is unrelated to the video, leave \"cuts\" \
empty and say so politely in \"message\".";

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Without a key every call fails and chat answers with the fallback
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            timeout: std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Inline { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// `ConversationEngine` backed by the Gemini REST API.
#[derive(Clone)]
pub struct GeminiEngine {
    config: GeminiConfig,
    client: Client,
}

impl GeminiEngine {
    pub fn new(config: GeminiConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EngineError::Request(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Turn the log into request contents. Video bytes are read from disk
    /// for every turn that references one.
    async fn build_contents(log: &[ChatTurn]) -> Result<Vec<Content>, EngineError> {
        let mut contents = Vec::with_capacity(log.len());
        for turn in log {
            let mut parts = Vec::with_capacity(2);
            if let Some(video) = &turn.video {
                let bytes = tokio::fs::read(video).await?;
                debug!("Attaching {} ({} bytes)", video.display(), bytes.len());
                parts.push(Part::Inline {
                    inline_data: InlineData {
                        mime_type: "video/mp4",
                        data: BASE64.encode(bytes),
                    },
                });
            }
            parts.push(Part::Text {
                text: turn.text.clone(),
            });

            contents.push(Content {
                role: match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Model => "model",
                },
                parts,
            });
        }
        Ok(contents)
    }
}

#[async_trait]
impl ConversationEngine for GeminiEngine {
    async fn generate(&self, log: &[ChatTurn]) -> Result<String, EngineError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| EngineError::NotConfigured("GEMINI_API_KEY is not set".to_string()))?;

        let request = GenerateRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part::Text {
                    text: SYSTEM_PROMPT.to_string(),
                }],
            },
            contents: Self::build_contents(log).await?,
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        info!(model = %self.config.model, turns = log.len(), "Calling Gemini");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Request(format!("Failed to parse Gemini response: {}", e)))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(EngineError::EmptyResponse);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn engine(server: &MockServer, api_key: Option<&str>) -> GeminiEngine {
        GeminiEngine::new(GeminiConfig {
            api_key: api_key.map(str::to_string),
            model: "gemini-test".to_string(),
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn reply(text: &str) -> Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] }
            }]
        })
    }

    #[tokio::test]
    async fn test_generate_sends_video_inline_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("{\"cuts\": [], \"message\": \"ok\"}")))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let video = dir.path().join("v.mp4");
        tokio::fs::write(&video, b"fake-video").await.unwrap();

        let log = vec![
            ChatTurn::user_with_video("find the goal", &video),
            ChatTurn::model("earlier reply"),
            ChatTurn::user("shorter please"),
        ];
        let text = engine(&server, Some("secret")).generate(&log).await.unwrap();
        assert_eq!(text, "{\"cuts\": [], \"message\": \"ok\"}");

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("\"cuts\""));

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["inline_data"]["mime_type"], "video/mp4");
        assert_eq!(contents[0]["parts"][0]["inline_data"]["data"], BASE64.encode(b"fake-video"));
        assert_eq!(contents[0]["parts"][1]["text"], "find the goal");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
            .mount(&server)
            .await;

        let err = engine(&server, Some("k"))
            .generate(&[ChatTurn::user("hi")])
            .await
            .unwrap_err();

        match err {
            EngineError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_candidates_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let err = engine(&server, Some("k"))
            .generate(&[ChatTurn::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let server = MockServer::start().await;

        let err = engine(&server, None)
            .generate(&[ChatTurn::user("hi")])
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::NotConfigured(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_video_file_is_io_error() {
        let server = MockServer::start().await;

        let err = engine(&server, Some("k"))
            .generate(&[ChatTurn::user_with_video("hi", "/nonexistent/v.mp4")])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
