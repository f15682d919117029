//! # ragline-model
//!
//! The language-model side of ragline: chat messages, the [`ChatModel`]
//! trait, prompt templates and an opt-in retry policy.
//!
//! ## Overview
//!
//! - [`Message`] / [`Role`] — role-tagged conversation turns
//! - [`ChatModel`] — "messages in, text out" abstraction over a provider
//! - [`PromptTemplate`], [`ChatPromptTemplate`], [`FewShotChatTemplate`] — `{slot}` templates
//! - [`RetryConfig`], [`with_retry`], [`RetryingChatModel`] — capped exponential backoff
//! - [`MockChatModel`] — scripted replies for tests and offline demos
//! - `openai::OpenAIChatModel` — OpenAI-compatible client (feature `openai`)
//! - `gemini::GeminiChatModel` — Google Gemini client (feature `gemini`)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ragline_model::{ChatModel, ChatPromptTemplate, MockChatModel};
//!
//! let prompt = ChatPromptTemplate::from_messages([
//!     ("system", "You are a sentiment classifier."),
//!     ("human", "Text: {text}\nClassify the sentiment."),
//! ])?;
//! let messages = prompt.format_messages(&values)?;
//! let reply = MockChatModel::new(["Positive"]).invoke(messages).await?;
//! ```

pub mod error;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod message;
pub mod mock;
pub mod model;
#[cfg(feature = "openai")]
pub mod openai;
pub mod prompt;
pub mod retry;

pub use error::{ModelError, Result};
#[cfg(feature = "gemini")]
pub use gemini::{GeminiChatModel, GeminiConfig};
pub use message::{Message, Role};
pub use mock::MockChatModel;
pub use model::{ChatModel, ChatRequest, ChatResponse};
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatModel, OpenAIConfig};
pub use prompt::{
    ChatPromptTemplate, ChatPromptTemplateBuilder, FewShotChatTemplate, PromptTemplate,
    PromptValues,
};
pub use retry::{RetryConfig, RetryingChatModel, Transient, with_retry};
