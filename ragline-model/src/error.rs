//! Error types for the `ragline-model` crate.

use std::time::Duration;

use thiserror::Error;

use crate::retry::Transient;

/// Errors that can occur while rendering prompts or invoking a chat model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The request could not be delivered (connection, timeout, body).
    #[error("Request error ({provider}): {message}")]
    Request {
        /// The model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The provider rejected the request because of rate limiting.
    #[error("Rate limited ({provider})")]
    RateLimited {
        /// The model provider that produced the error.
        provider: String,
        /// Server-suggested delay before retrying, if any.
        retry_after_secs: Option<u64>,
    },

    /// The provider answered with a non-success status.
    #[error("API error ({provider}) status {status}: {message}")]
    Api {
        /// The model provider that produced the error.
        provider: String,
        /// The HTTP status code.
        status: u16,
        /// The error detail returned by the provider.
        message: String,
    },

    /// The provider answered, but the payload was unusable.
    #[error("Invalid response ({provider}): {message}")]
    InvalidResponse {
        /// The model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A prompt template could not be parsed or rendered.
    #[error("Template error: {0}")]
    Template(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

impl Transient for ModelError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Request { .. } | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            Self::InvalidResponse { .. } | Self::Template(_) | Self::Config(_) => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after_secs: Some(secs), .. } => {
                Some(Duration::from_secs(*secs))
            }
            _ => None,
        }
    }
}
