//! The [`ChatModel`] trait and its request/response types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;

/// A request to a chat model: the conversation plus optional sampling settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The ordered conversation sent to the model.
    pub messages: Vec<Message>,
    /// Sampling temperature, if the caller wants to override the provider default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Create a request for the given messages with provider defaults.
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages, ..Self::default() }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// The single text reply produced by a chat model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The reply text.
    pub content: String,
    /// The model that produced the reply.
    pub model: String,
}

/// A language model that answers a role-tagged conversation with a text reply.
///
/// Implementations wrap specific backends (OpenAI-compatible servers, mocks)
/// behind a unified async interface. Calls are request/response: the returned
/// future resolves once the full reply is available.
///
/// # Example
///
/// ```rust,ignore
/// use ragline_model::{ChatModel, Message};
///
/// let reply = model.invoke(vec![Message::user("Tell me a fact about Mars")]).await?;
/// ```
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Return the model identifier used in logs.
    fn name(&self) -> &str;

    /// Generate a reply for the given request.
    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Generate a reply for `messages` with provider defaults and return only its text.
    async fn invoke(&self, messages: Vec<Message>) -> Result<String> {
        let response = self.generate(ChatRequest::new(messages)).await?;
        Ok(response.content)
    }
}
