//! Gemini embedding provider (`batchEmbedContents`).
//!
//! This module is only available when the `gemini` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default Gemini embedding model.
const DEFAULT_MODEL: &str = "gemini-embedding-001";

/// Default embedding dimensions for `gemini-embedding-001`.
const DEFAULT_DIMENSIONS: usize = 3072;

/// Most texts the API accepts in one `batchEmbedContents` call.
const MAX_BATCH: usize = 100;

const PROVIDER: &str = "Gemini";

/// What the embedding will be used for; lets the model tune the vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// A search query matched against stored documents.
    RetrievalQuery,
    /// A document stored for later retrieval.
    RetrievalDocument,
    /// Symmetric text similarity.
    SemanticSimilarity,
    /// Input to a classifier.
    Classification,
    /// Input to clustering.
    Clustering,
}

/// An [`EmbeddingProvider`] backed by the Gemini embedding API.
///
/// # Configuration
///
/// - `task_type` – [`TaskType::RetrievalDocument`] for [`embed_batch`](EmbeddingProvider::embed_batch)
///   (ingestion) and [`TaskType::RetrievalQuery`] for [`embed`](EmbeddingProvider::embed)
///   (queries). Override both with [`with_task_type`](Self::with_task_type).
/// - `output_dimensionality` – optional truncation of the output vector.
/// - `api_key` – from the constructor or `GOOGLE_API_KEY` / `GEMINI_API_KEY`.
///
/// # Example
///
/// ```rust,ignore
/// use ragline::gemini::GeminiEmbeddingProvider;
///
/// let provider = GeminiEmbeddingProvider::new("your-api-key")?.with_output_dimensionality(768);
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct GeminiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    query_task: TaskType,
    document_task: TaskType,
    output_dimensionality: Option<usize>,
    dimensions: usize,
}

impl GeminiEmbeddingProvider {
    /// Create a new provider using the given API key and `gemini-embedding-001`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::Config("Gemini API key must not be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: format!("models/{DEFAULT_MODEL}"),
            endpoint: batch_endpoint(GEMINI_BASE_URL, DEFAULT_MODEL),
            query_task: TaskType::RetrievalQuery,
            document_task: TaskType::RetrievalDocument,
            output_dimensionality: None,
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Create a new provider using `GOOGLE_API_KEY` (or `GEMINI_API_KEY`).
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .map_err(|_| RagError::Config("GOOGLE_API_KEY environment variable not set".into()))?;
        Self::new(api_key)
    }

    /// Set the embedding model (with or without the `models/` prefix).
    ///
    /// Call [`with_output_dimensionality`](Self::with_output_dimensionality)
    /// too if the model's output size differs from 3072.
    pub fn with_model(mut self, model: impl AsRef<str>) -> Self {
        let name = model.as_ref().trim_start_matches("models/");
        self.model = format!("models/{name}");
        self.endpoint = batch_endpoint(GEMINI_BASE_URL, name);
        self
    }

    /// Use the same task type for queries and documents.
    pub fn with_task_type(mut self, task_type: TaskType) -> Self {
        self.query_task = task_type;
        self.document_task = task_type;
        self
    }

    /// Set the output dimensionality (truncates the embedding vector).
    pub fn with_output_dimensionality(mut self, dims: usize) -> Self {
        self.output_dimensionality = Some(dims);
        self.dimensions = dims;
        self
    }

    async fn embed_with_task(&self, texts: &[&str], task_type: TaskType) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            vectors.extend(self.send_batch(batch, task_type).await?);
        }
        Ok(vectors)
    }

    async fn send_batch(&self, texts: &[&str], task_type: TaskType) -> Result<Vec<Vec<f32>>> {
        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|&text| EmbedRequest {
                    model: &self.model,
                    content: EmbedContent { parts: [EmbedPart { text }] },
                    task_type,
                    output_dimensionality: self.output_dimensionality,
                })
                .collect(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::embedding_transport(PROVIDER, format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(RagError::embedding_status(
                PROVIDER,
                status.as_u16(),
                format!("API returned {status}: {detail}"),
            ));
        }

        let parsed: BatchEmbedResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::embedding_reply(PROVIDER, format!("failed to parse response: {e}"))
        })?;

        collect_embeddings(parsed, texts.len())
    }
}

fn batch_endpoint(base_url: &str, model: &str) -> String {
    format!("{}/models/{model}:batchEmbedContents", base_url.trim_end_matches('/'))
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: &'a str,
    content: EmbedContent<'a>,
    task_type: TaskType,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Serialize)]
struct EmbedContent<'a> {
    parts: [EmbedPart<'a>; 1],
}

#[derive(Serialize)]
struct EmbedPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Embeddings come back in request order; check there is one per input.
fn collect_embeddings(response: BatchEmbedResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if response.embeddings.len() != expected {
        return Err(RagError::embedding_reply(
            PROVIDER,
            format!("expected {expected} embeddings, API returned {}", response.embeddings.len()),
        ));
    }
    Ok(response.embeddings.into_iter().map(|e| e.values).collect())
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding query");

        let vectors = self.embed_with_task(&[text], self.query_task).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding_reply(PROVIDER, "API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");
        self.embed_with_task(texts, self.document_task).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_empty_key() {
        assert!(matches!(GeminiEmbeddingProvider::new(""), Err(RagError::Config(_))));
    }

    #[test]
    fn model_and_dimensions_are_configurable() {
        let provider = GeminiEmbeddingProvider::new("key")
            .unwrap()
            .with_model("models/text-embedding-004")
            .with_output_dimensionality(768);
        assert_eq!(provider.model, "models/text-embedding-004");
        assert_eq!(
            provider.endpoint,
            "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:batchEmbedContents"
        );
        assert_eq!(provider.dimensions(), 768);
    }

    #[test]
    fn request_carries_task_type_and_dimensionality() {
        let request = EmbedRequest {
            model: "models/gemini-embedding-001",
            content: EmbedContent { parts: [EmbedPart { text: "Mars is red." }] },
            task_type: TaskType::RetrievalDocument,
            output_dimensionality: Some(768),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "models/gemini-embedding-001",
                "content": { "parts": [{ "text": "Mars is red." }] },
                "taskType": "RETRIEVAL_DOCUMENT",
                "outputDimensionality": 768,
            })
        );
    }

    #[test]
    fn short_reply_is_a_permanent_error() {
        let response: BatchEmbedResponse =
            serde_json::from_value(json!({ "embeddings": [{ "values": [0.5, 0.5] }] })).unwrap();
        assert!(matches!(
            collect_embeddings(response, 2),
            Err(RagError::EmbeddingService { transient: false, .. })
        ));

        let response: BatchEmbedResponse = serde_json::from_value(json!({
            "embeddings": [{ "values": [1.0, 0.0] }, { "values": [0.0, 1.0] }]
        }))
        .unwrap();
        assert_eq!(collect_embeddings(response, 2).unwrap(), vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }
}
