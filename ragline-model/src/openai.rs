//! OpenAI-compatible chat completions client.
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{ModelError, Result};
use crate::message::Message;
use crate::model::{ChatModel, ChatRequest, ChatResponse};

/// The default OpenAI API base URL.
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// The default chat model.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

const PROVIDER: &str = "OpenAI";

/// Connection settings for [`OpenAIChatModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAIConfig {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Model name, e.g. `gpt-4o-mini`.
    pub model: String,
    /// Base URL without the `/chat/completions` suffix.
    pub base_url: String,
    /// Default sampling temperature, overridden per request.
    pub temperature: Option<f32>,
}

impl OpenAIConfig {
    /// Settings for the public OpenAI API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            temperature: None,
        }
    }

    /// Settings for an OpenAI-compatible server (Ollama, vLLM, ...).
    pub fn compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self { base_url: base_url.into(), ..Self::new(api_key, model) }
    }

    /// Set the default sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A [`ChatModel`] backed by the `/chat/completions` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use ragline_model::openai::{OpenAIChatModel, OpenAIConfig};
///
/// let model = OpenAIChatModel::new(OpenAIConfig::new("sk-...", "gpt-4o-mini"))?;
/// let reply = model.invoke(vec![Message::user("Here is a fact about Mars")]).await?;
/// ```
pub struct OpenAIChatModel {
    client: reqwest::Client,
    config: OpenAIConfig,
    endpoint: String,
}

impl OpenAIChatModel {
    /// Create a client from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] if the API key or model name is empty.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ModelError::Config("API key must not be empty".into()));
        }
        if config.model.trim().is_empty() {
            return Err(ModelError::Config("model name must not be empty".into()));
        }
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        Ok(Self { client: reqwest::Client::new(), config, endpoint })
    }

    /// Create a client for an OpenAI-compatible API.
    pub fn compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        Self::new(OpenAIConfig::compatible(api_key, base_url, model))
    }

    /// Create a client using the `OPENAI_API_KEY` environment variable and the default model.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ModelError::Config("OPENAI_API_KEY environment variable not set".into()))?;
        Self::new(OpenAIConfig::new(api_key, DEFAULT_MODEL))
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: &message.content,
            name: message.metadata.get("name").and_then(|v| v.as_str()),
        }
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    model: Option<String>,
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── ChatModel implementation ───────────────────────────────────────

#[async_trait]
impl ChatModel for OpenAIChatModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse> {
        debug!(
            provider = PROVIDER,
            model = %self.config.model,
            message_count = request.messages.len(),
            "chat completion"
        );

        let body = CompletionRequest {
            model: &self.config.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            temperature: request.temperature.or(self.config.temperature),
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
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

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            ModelError::InvalidResponse {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ModelError::InvalidResponse {
                provider: PROVIDER.into(),
                message: "response contained no message content".into(),
            })?;

        Ok(ChatResponse {
            content,
            model: completion.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_key() {
        assert!(matches!(
            OpenAIChatModel::new(OpenAIConfig::new("  ", "gpt-4o-mini")),
            Err(ModelError::Config(_))
        ));
    }

    #[test]
    fn compatible_endpoint_strips_trailing_slash() {
        let model = OpenAIChatModel::compatible("key", "http://localhost:11434/v1/", "llama3").unwrap();
        assert_eq!(model.endpoint, "http://localhost:11434/v1/chat/completions");
        assert_eq!(model.name(), "llama3");
    }

    #[test]
    fn wire_message_forwards_name() {
        let message = Message::user("hi").with_metadata("name", "amey");
        let wire = serde_json::to_value(WireMessage::from(&message)).unwrap();
        assert_eq!(wire, serde_json::json!({ "role": "user", "content": "hi", "name": "amey" }));
    }
}
