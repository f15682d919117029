//! Error types for the `ragline` crate.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ragline_model::{ModelError, Transient};

/// Errors that can occur in RAG operations.
///
/// Every stage fails fast and surfaces its error unchanged to the caller.
#[derive(Debug, Error)]
pub enum RagError {
    /// A loader could not open or read its source.
    #[error("Source unavailable ({source_name}): {message}")]
    SourceUnavailable {
        /// The source descriptor (path or URL).
        source_name: String,
        /// A description of the failure.
        message: String,
    },

    /// A loader read its source but could not decode it into text.
    #[error("Unsupported format ({source_name}): {message}")]
    UnsupportedFormat {
        /// The source descriptor (path or URL).
        source_name: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding service failed (transport, quota, malformed reply).
    ///
    /// Build it with [`embedding_transport`](Self::embedding_transport),
    /// [`embedding_status`](Self::embedding_status) or
    /// [`embedding_reply`](Self::embedding_reply) so `transient` is set
    /// consistently.
    #[error("Embedding service error ({provider}): {message}")]
    EmbeddingService {
        /// The embedding provider that produced the error.
        provider: String,
        /// The HTTP status, when the service answered with an error status.
        status: Option<u16>,
        /// Whether repeating the same call may succeed.
        transient: bool,
        /// A description of the failure.
        message: String,
    },

    /// A query was issued against a store holding zero records.
    ///
    /// Advisory: callers usually treat this as "no context".
    #[error("Vector store is empty")]
    EmptyStore,

    /// A vector's dimensionality differs from the store's.
    #[error("Dimension mismatch: store holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch {
        /// Dimensionality fixed by the first stored record.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A model reply could not be decoded against the declared schema.
    #[error("Output parse error: {message}{}", DisplayViolations(.violations))]
    OutputParse {
        /// A description of the failure.
        message: String,
        /// Field-level schema violations, empty when the reply held no decodable JSON.
        violations: Vec<FieldViolation>,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An error propagated from the chat model layer.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

/// A single schema violation found while validating a model reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// JSON pointer to the offending location (`""` for the root).
    pub path: String,
    /// What is wrong at that location.
    pub message: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { self.path.as_str() };
        write!(f, "{path}: {}", self.message)
    }
}

struct DisplayViolations<'a>(&'a [FieldViolation]);

impl fmt::Display for DisplayViolations<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            f.write_str(if i == 0 { " [" } else { "; " })?;
            write!(f, "{violation}")?;
        }
        if !self.0.is_empty() {
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl RagError {
    /// The embedding call never got a response (connection, timeout).
    pub fn embedding_transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingService { provider: provider.into(), status: None, transient: true, message: message.into() }
    }

    /// The embedding service answered with a non-success `status`.
    ///
    /// Only `429` and `5xx` are transient.
    pub fn embedding_status(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::EmbeddingService {
            provider: provider.into(),
            status: Some(status),
            transient: status == 429 || status >= 500,
            message: message.into(),
        }
    }

    /// The embedding service answered, but the reply is unusable.
    pub fn embedding_reply(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingService { provider: provider.into(), status: None, transient: false, message: message.into() }
    }

    /// Whether this is the advisory [`RagError::EmptyStore`].
    pub fn is_empty_store(&self) -> bool {
        matches!(self, Self::EmptyStore)
    }
}

impl Transient for RagError {
    fn is_transient(&self) -> bool {
        match self {
            Self::EmbeddingService { transient, .. } => *transient,
            Self::Model(e) => e.is_transient(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            Self::Model(e) => e.retry_after(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_parse_lists_violations() {
        let err = RagError::OutputParse {
            message: "schema validation failed".into(),
            violations: vec![
                FieldViolation { path: "".into(), message: "\"sources\" is a required property".into() },
                FieldViolation { path: "/summary".into(), message: "1 is not of type \"string\"".into() },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Output parse error: schema validation failed [/: \"sources\" is a required property; \
             /summary: 1 is not of type \"string\"]"
        );
    }

    #[test]
    fn embedding_failures_are_transient_only_when_retry_can_help() {
        assert!(RagError::embedding_transport("p", "connection reset").is_transient());
        assert!(RagError::embedding_status("p", 503, "unavailable").is_transient());
        assert!(RagError::embedding_status("p", 429, "slow down").is_transient());

        assert!(!RagError::embedding_status("p", 401, "invalid api key").is_transient());
        assert!(!RagError::embedding_status("p", 400, "input too long").is_transient());
        assert!(!RagError::embedding_reply("p", "expected 2 embeddings, got 1").is_transient());

        let err = RagError::embedding_status("p", 401, "invalid api key");
        assert!(matches!(err, RagError::EmbeddingService { status: Some(401), .. }));
    }

    #[test]
    fn empty_store_is_advisory_and_permanent() {
        assert!(!RagError::EmptyStore.is_transient());
        assert!(RagError::EmptyStore.is_empty_store());
    }
}
