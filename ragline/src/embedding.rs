//! Embedding provider trait and the opt-in retry wrapper.

use async_trait::async_trait;
use ragline_model::{RetryConfig, with_retry};

use crate::error::Result;

/// A provider that maps text to fixed-dimension vectors.
///
/// Implementations wrap a specific embedding backend behind one async
/// interface. The default [`embed_batch`](EmbeddingProvider::embed_batch)
/// calls [`embed`](EmbeddingProvider::embed) sequentially; backends that
/// support native batching should override it.
///
/// Contract: `embed_batch` returns exactly one vector per input, in input
/// order. Every vector has [`dimensions`](EmbeddingProvider::dimensions)
/// elements.
///
/// # Example
///
/// ```rust,ignore
/// use ragline::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let vector = provider.embed("hello world").await?;
/// assert_eq!(vector.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Dimensionality of the vectors this provider produces.
    fn dimensions(&self) -> usize;

    /// Provider name used in logs and errors.
    fn name(&self) -> &str {
        "embedding"
    }
}

/// Wraps an [`EmbeddingProvider`] and retries transient failures with
/// capped exponential backoff.
///
/// Only transient [`RagError::EmbeddingService`](crate::RagError::EmbeddingService)
/// failures (no response, `429`, `5xx`) and transient model errors are
/// retried; every other error is returned on the first attempt.
pub struct RetryingEmbeddingProvider<E> {
    inner: E,
    config: RetryConfig,
}

impl<E: EmbeddingProvider> RetryingEmbeddingProvider<E> {
    /// Wrap `inner` with the given retry policy.
    pub fn new(inner: E, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Unwrap the inner provider.
    pub fn into_inner(self) -> E {
        self.inner
    }
}

#[async_trait]
impl<E: EmbeddingProvider> EmbeddingProvider for RetryingEmbeddingProvider<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        with_retry(&self.config, || self.inner.embed(text)).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        with_retry(&self.config, || self.inner.embed_batch(texts)).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
