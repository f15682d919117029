//! Capped exponential-backoff retry for network-bound calls.
//!
//! Nothing in the pipeline retries on its own. Callers opt in by wrapping a
//! model with [`RetryingChatModel`] (or an embedding provider with the
//! equivalent wrapper in `ragline`), or by calling [`with_retry`] directly.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::model::{ChatModel, ChatRequest, ChatResponse};

/// Classifies an error as worth retrying.
pub trait Transient {
    /// Whether the failure is expected to go away on its own (network, 429, 5xx).
    fn is_transient(&self) -> bool;

    /// Delay requested by the server, if it sent one.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Retry policy: how many extra attempts to make and how long to wait between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay.
    pub max_backoff_ms: u64,
    /// Growth factor applied per attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3, initial_backoff_ms: 500, max_backoff_ms: 8_000, backoff_multiplier: 2.0 }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    /// Delay before retry number `attempt` (0-based), ignoring server hints.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_backoff_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

/// Run `operation`, retrying transient failures according to `config`.
///
/// Permanent errors are returned immediately. When the error carries a
/// server-provided delay, the larger of that delay and the computed backoff
/// is used (still capped at `max_backoff_ms`).
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Transient + Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !e.is_transient() || attempt >= config.max_retries {
                    return Err(e);
                }

                let computed = config.backoff(attempt);
                let delay = e
                    .retry_after()
                    .map(|hint| hint.max(computed).min(Duration::from_millis(config.max_backoff_ms)))
                    .unwrap_or(computed);

                warn!(
                    attempt = attempt + 1,
                    max = config.max_retries,
                    backoff_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after transient error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// A [`ChatModel`] wrapper that retries transient failures of the inner model.
pub struct RetryingChatModel<M> {
    inner: M,
    config: RetryConfig,
}

impl<M: ChatModel> RetryingChatModel<M> {
    /// Wrap `inner` with the given retry policy.
    pub fn new(inner: M, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Return the wrapped model.
    pub fn into_inner(self) -> M {
        self.inner
    }
}

#[async_trait]
impl<M: ChatModel> ChatModel for RetryingChatModel<M> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse> {
        with_retry(&self.config, || self.inner.generate(request.clone())).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::ModelError;

    fn transient() -> ModelError {
        ModelError::Request { provider: "test".into(), message: "connection reset".into() }
    }

    #[test]
    fn backoff_grows_and_caps() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff(0), Duration::from_millis(500));
        assert_eq!(config.backoff(1), Duration::from_millis(1_000));
        assert_eq!(config.backoff(10), Duration::from_millis(8_000));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<u32, ModelError> =
            with_retry(&RetryConfig::default(), || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err(transient()) } else { Ok(n) }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig { max_retries: 2, ..RetryConfig::default() };
        let result: std::result::Result<(), ModelError> = with_retry(&config, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(transient())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<(), ModelError> =
            with_retry(&RetryConfig::default(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ModelError::Api { provider: "test".into(), status: 401, message: "bad key".into() })
            })
            .await;

        assert!(matches!(result, Err(ModelError::Api { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_policy_makes_one_attempt() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<(), ModelError> =
            with_retry(&RetryConfig::disabled(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
