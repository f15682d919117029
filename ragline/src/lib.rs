//! # ragline
//!
//! Retrieval-augmented generation as five narrow stages composed in a line:
//! load → split → embed → store/retrieve → generate.
//!
//! ## Overview
//!
//! - [`DocumentLoader`] — text, CSV (`csv`), PDF (`pdf`) and web page (`web`) loaders
//! - [`RecursiveChunker`] — boundary-seeking splitter with bounded overlap
//! - [`EmbeddingProvider`] — text to vectors; `openai::OpenAIEmbeddingProvider` behind `openai`,
//!   `gemini::GeminiEmbeddingProvider` behind `gemini`
//! - [`VectorStore`] — [`InMemoryVectorStore`] and the persistent [`FileVectorStore`]
//! - [`RagPipeline`] — indexing and retrieval over the stages above
//! - [`Generator`] — prompt → [`ChatModel`](ragline_model::ChatModel) → [`OutputParser`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragline::{
//!     DistanceMetric, Generator, InMemoryVectorStore, RagConfig, RagPipeline,
//!     StructuredAnswer, StructuredOutputParser, TextLoader,
//! };
//!
//! let pipeline = Arc::new(
//!     RagPipeline::builder()
//!         .config(RagConfig::default())
//!         .embedding_provider(Arc::new(embedder))
//!         .vector_store(Arc::new(InMemoryVectorStore::new(DistanceMetric::Cosine)))
//!         .build()?,
//! );
//! pipeline.index(&TextLoader::new("notes.txt")).await?;
//!
//! let generator = Generator::builder()
//!     .pipeline(pipeline)
//!     .model(Arc::new(model))
//!     .parser(StructuredOutputParser::<StructuredAnswer>::new()?)
//!     .build()?;
//! let answer = generator.answer("What do my notes say about Mars?").await?;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod file_store;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod generator;
pub mod inmemory;
pub mod loader;
#[cfg(feature = "openai")]
pub mod openai;
pub mod output;
pub mod pipeline;
pub mod vectorstore;

pub use chunking::{Chunker, DEFAULT_SEPARATORS, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, Metadata, MetadataValue, SearchResult, StoredRecord};
pub use embedding::{EmbeddingProvider, RetryingEmbeddingProvider};
pub use error::{FieldViolation, RagError, Result};
pub use file_store::FileVectorStore;
#[cfg(feature = "gemini")]
pub use gemini::{GeminiEmbeddingProvider, TaskType};
pub use generator::{GeneratedAnswer, Generator, GeneratorBuilder, default_prompt};
pub use inmemory::InMemoryVectorStore;
#[cfg(feature = "csv")]
pub use loader::CsvLoader;
#[cfg(feature = "pdf")]
pub use loader::PdfLoader;
#[cfg(feature = "web")]
pub use loader::WebLoader;
pub use loader::{DocumentLoader, TextLoader, loader_for};
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
pub use output::{
    JsonOutputParser, OutputParser, StructuredAnswer, StructuredOutputParser, TextOutputParser,
};
pub use pipeline::{IndexReport, RagPipeline, RagPipelineBuilder};
pub use vectorstore::{DistanceMetric, VectorStore};
