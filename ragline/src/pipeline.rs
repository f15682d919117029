//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] composes a [`Chunker`], an [`EmbeddingProvider`] and
//! a [`VectorStore`] into the indexing path (load → chunk → embed → store)
//! and the retrieval path (embed → query → filter).
//!
//! # Example
//!
//! ```rust,ignore
//! use ragline::{DistanceMetric, InMemoryVectorStore, RagConfig, RagPipeline, TextLoader};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new(DistanceMetric::Cosine)))
//!     .build()?;
//!
//! pipeline.index(&TextLoader::new("notes.txt")).await?;
//! let results = pipeline.retrieve("what is in my notes?").await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Document, SearchResult, StoredRecord};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::loader::DocumentLoader;
use crate::vectorstore::VectorStore;

/// Summary of one [`RagPipeline::index`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexReport {
    /// Documents produced by the loader.
    pub documents: usize,
    /// Chunks embedded and upserted.
    pub chunks: usize,
}

/// The RAG pipeline orchestrator.
///
/// Every stage fails fast: the first error aborts the operation and is
/// returned unchanged. Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Ingest a single document: chunk → embed → upsert.
    ///
    /// Returns the records that were stored. Re-ingesting the same document
    /// replaces its records instead of duplicating them.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmbeddingService`] if embedding fails or returns the wrong number of vectors.
    /// - Any error from the vector store (e.g. [`RagError::DimensionMismatch`]).
    pub async fn ingest(&self, document: &Document) -> Result<Vec<StoredRecord>> {
        let chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            info!(document.id = %document.id, chunk_count = 0, "ingested document (empty)");
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
            e
        })?;

        if vectors.len() != chunks.len() {
            error!(
                document.id = %document.id,
                expected = chunks.len(),
                actual = vectors.len(),
                "embedding count mismatch"
            );
            return Err(RagError::embedding_reply(
                self.embedding_provider.name(),
                format!(
                    "expected {} embeddings for document '{}', got {}",
                    chunks.len(),
                    document.id,
                    vectors.len()
                ),
            ));
        }

        let records: Vec<StoredRecord> =
            chunks.into_iter().zip(vectors).map(|(chunk, vector)| StoredRecord::new(chunk, vector)).collect();

        self.vector_store.upsert(&records).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "upsert failed during ingestion");
            e
        })?;

        info!(document.id = %document.id, chunk_count = records.len(), "ingested document");
        Ok(records)
    }

    /// Ingest documents in order, stopping at the first failure.
    ///
    /// Returns all records stored across all documents.
    pub async fn ingest_batch(&self, documents: &[Document]) -> Result<Vec<StoredRecord>> {
        let mut all_records = Vec::new();
        for document in documents {
            all_records.extend(self.ingest(document).await?);
        }
        Ok(all_records)
    }

    /// Load every document from `loader` and ingest it.
    ///
    /// # Errors
    ///
    /// Loader errors ([`RagError::SourceUnavailable`], [`RagError::UnsupportedFormat`])
    /// plus everything [`ingest`](Self::ingest) can return.
    pub async fn index(&self, loader: &dyn DocumentLoader) -> Result<IndexReport> {
        let documents = loader.load().await.map_err(|e| {
            error!(source = loader.source(), error = %e, "loading failed");
            e
        })?;
        let records = self.ingest_batch(&documents).await?;

        let report = IndexReport { documents: documents.len(), chunks: records.len() };
        info!(source = loader.source(), documents = report.documents, chunks = report.chunks, "indexed source");
        Ok(report)
    }

    /// Retrieve the context for `question`: embed → query `top_k` → drop
    /// results beyond `max_distance`.
    ///
    /// Results are ordered nearest-first.
    ///
    /// # Errors
    ///
    /// [`RagError::EmptyStore`] when nothing has been indexed yet; embedding
    /// and store errors otherwise.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        let vector = self.embedding_provider.embed(question).await.map_err(|e| {
            error!(error = %e, "embedding failed during retrieval");
            e
        })?;

        let results = self.vector_store.query(&vector, self.config.top_k).await?;

        let results: Vec<SearchResult> = match self.config.max_distance {
            Some(max) => results.into_iter().filter(|r| r.distance <= max).collect(),
            None => results,
        };

        info!(top_k = self.config.top_k, result_count = results.len(), "retrieval completed");
        Ok(results)
    }

    /// Number of records in the vector store.
    pub async fn count(&self) -> Result<usize> {
        self.vector_store.count().await
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `embedding_provider` and `vector_store` are required. `config` defaults
/// to [`RagConfig::default()`] and `chunker` to a [`RecursiveChunker`] built
/// from the config.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::builder().chunk_size(500).chunk_overlap(100).build()?)
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Replace the default chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RagPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing or the
    /// config is inconsistent.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let chunker =
            self.chunker.unwrap_or_else(|| Arc::new(RecursiveChunker::from_config(&config)));

        if vector_store.metric() != config.metric {
            warn!(
                store = %vector_store.metric(),
                config = %config.metric,
                "vector store metric differs from config; the store's metric is used"
            );
        }

        Ok(RagPipeline { config, embedding_provider, vector_store, chunker })
    }
}
