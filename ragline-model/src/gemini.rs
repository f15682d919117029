//! Google Gemini chat client (`generateContent`).
//!
//! This module is only available when the `gemini` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{ModelError, Result};
use crate::message::{Message, Role};
use crate::model::{ChatModel, ChatRequest, ChatResponse};

/// The default Gemini API base URL (AI Studio, `v1beta`).
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default chat model.
const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

const PROVIDER: &str = "Gemini";

/// Connection settings for [`GeminiChatModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    /// API key sent in the `x-goog-api-key` header.
    pub api_key: String,
    /// Model name, e.g. `gemini-2.5-flash-lite`. A `models/` prefix is accepted.
    pub model: String,
    /// Base URL without the `/models/...` suffix.
    pub base_url: String,
    /// Default sampling temperature, overridden per request.
    pub temperature: Option<f32>,
}

impl GeminiConfig {
    /// Settings for the public Gemini API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            temperature: None,
        }
    }

    /// Use a different API root (proxy, `v1`).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the default sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A [`ChatModel`] backed by Gemini's `models/{model}:generateContent` endpoint.
///
/// System messages are merged into the request's `systemInstruction`;
/// assistant turns are sent with the `model` role.
///
/// # Example
///
/// ```rust,ignore
/// use ragline_model::gemini::GeminiChatModel;
///
/// let model = GeminiChatModel::from_env()?;
/// let reply = model.invoke(vec![Message::user("What is retrieval-augmented generation?")]).await?;
/// ```
pub struct GeminiChatModel {
    client: reqwest::Client,
    config: GeminiConfig,
    endpoint: String,
}

impl GeminiChatModel {
    /// Create a client from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] if the API key or model name is empty.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ModelError::Config("API key must not be empty".into()));
        }
        let model = config.model.trim().trim_start_matches("models/");
        if model.is_empty() {
            return Err(ModelError::Config("model name must not be empty".into()));
        }
        let endpoint =
            format!("{}/models/{model}:generateContent", config.base_url.trim_end_matches('/'));
        Ok(Self { client: reqwest::Client::new(), config, endpoint })
    }

    /// Create a client using `GOOGLE_API_KEY` (or `GEMINI_API_KEY`) and the default model.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .map_err(|_| {
                ModelError::Config("GOOGLE_API_KEY environment variable not set".into())
            })?;
        Self::new(GeminiConfig::new(api_key, DEFAULT_MODEL))
    }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: [OwnedTextPart; 1],
}

#[derive(Debug, Serialize)]
struct OwnedTextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(messages: &'a [Message], temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        let contents = messages
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    Role::System => return None,
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                Some(Content { role, parts: [TextPart { text: &m.content }] })
            })
            .collect();

        Self {
            contents,
            system_instruction: (!system.is_empty())
                .then(|| SystemInstruction { parts: [OwnedTextPart { text: system.join("\n\n") }] }),
            generation_config: (temperature.is_some() || max_tokens.is_some())
                .then_some(GenerationConfig { temperature, max_output_tokens: max_tokens }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GenerateContentResponse {
    /// Text of the first candidate, its parts concatenated.
    fn into_text(self) -> Result<String> {
        let invalid = |message: String| ModelError::InvalidResponse { provider: PROVIDER.into(), message };

        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self.prompt_feedback.and_then(|f| f.block_reason);
            return Err(invalid(match reason {
                Some(reason) => format!("prompt blocked: {reason}"),
                None => "response contained no candidates".into(),
            }));
        };

        let text: String = candidate
            .content
            .into_iter()
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();
        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
            return Err(invalid(format!("candidate has no text (finish reason {reason})")));
        }
        Ok(text)
    }
}

// ── ChatModel implementation ───────────────────────────────────────

#[async_trait]
impl ChatModel for GeminiChatModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse> {
        debug!(
            provider = PROVIDER,
            model = %self.config.model,
            message_count = request.messages.len(),
            "generate content"
        );

        let body = GenerateContentRequest::new(
            &request.messages,
            request.temperature.or(self.config.temperature),
            request.max_tokens,
        );
        if body.contents.is_empty() {
            warn!(provider = PROVIDER, "request has only system messages");
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                ModelError::Request { provider: PROVIDER.into(), message: format!("request failed: {e}") }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            error!(provider = PROVIDER, ?retry_after_secs, "rate limited");
            return Err(ModelError::RateLimited { provider: PROVIDER.into(), retry_after_secs });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(ModelError::Api {
                provider: PROVIDER.into(),
                status: status.as_u16(),
                message: detail,
            });
        }

        let generated: GenerateContentResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            ModelError::InvalidResponse {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        let model = generated.model_version.clone().unwrap_or_else(|| self.config.model.clone());
        let content = generated.into_text().inspect_err(|e| {
            error!(provider = PROVIDER, error = %e, "unusable response");
        })?;

        Ok(ChatResponse { content, model })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_empty_key_and_model() {
        assert!(matches!(
            GeminiChatModel::new(GeminiConfig::new(" ", DEFAULT_MODEL)),
            Err(ModelError::Config(_))
        ));
        assert!(matches!(
            GeminiChatModel::new(GeminiConfig::new("key", "models/")),
            Err(ModelError::Config(_))
        ));
    }

    #[test]
    fn endpoint_names_the_model() {
        let model = GeminiChatModel::new(GeminiConfig::new("key", "models/gemini-2.5-flash")).unwrap();
        assert_eq!(
            model.endpoint,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );

        let proxied = GeminiChatModel::new(
            GeminiConfig::new("key", DEFAULT_MODEL).with_base_url("http://localhost:8080/v1/"),
        )
        .unwrap();
        assert_eq!(proxied.endpoint, "http://localhost:8080/v1/models/gemini-2.5-flash-lite:generateContent");
    }

    #[test]
    fn system_messages_become_the_system_instruction() {
        let messages = vec![
            Message::system("You are terse."),
            Message::user("Hi"),
            Message::assistant("Hello."),
            Message::system("Answer in English."),
            Message::user("What is RAG?"),
        ];
        let body = serde_json::to_value(GenerateContentRequest::new(&messages, Some(0.0), None)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "Hi" }] },
                    { "role": "model", "parts": [{ "text": "Hello." }] },
                    { "role": "user", "parts": [{ "text": "What is RAG?" }] },
                ],
                "systemInstruction": { "parts": [{ "text": "You are terse.\n\nAnswer in English." }] },
                "generationConfig": { "temperature": 0.0 },
            })
        );
    }

    #[test]
    fn defaults_are_omitted_from_the_request() {
        let messages = vec![Message::user("Hi")];
        let body = serde_json::to_value(GenerateContentRequest::new(&messages, None, None)).unwrap();
        assert_eq!(body, json!({ "contents": [{ "role": "user", "parts": [{ "text": "Hi" }] }] }));
    }

    #[test]
    fn reply_text_joins_candidate_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Retrieval-augmented " }, { "text": "generation." }], "role": "model" },
                "finishReason": "STOP",
                "index": 0
            }],
            "usageMetadata": { "promptTokenCount": 5, "totalTokenCount": 9 },
            "modelVersion": "gemini-2.5-flash-lite"
        }))
        .unwrap();
        assert_eq!(response.model_version.as_deref(), Some("gemini-2.5-flash-lite"));
        assert_eq!(response.into_text().unwrap(), "Retrieval-augmented generation.");
    }

    #[test]
    fn blocked_prompt_is_an_invalid_response() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({ "promptFeedback": { "blockReason": "SAFETY" } })).unwrap();
        let err = response.into_text().unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse { ref message, .. } if message.contains("SAFETY")));
    }

    #[test]
    fn empty_candidate_reports_finish_reason() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [{ "finishReason": "MAX_TOKENS" }] })).unwrap();
        let err = response.into_text().unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }
}
