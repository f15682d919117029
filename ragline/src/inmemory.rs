//! In-memory vector store.
//!
//! This module provides [`InMemoryVectorStore`], a brute-force store backed
//! by an insertion-ordered `IndexMap` protected by a `tokio::sync::RwLock`.
//! It is suitable for development, testing, and small corpora.

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{SearchResult, StoredRecord};
use crate::error::{RagError, Result};
use crate::vectorstore::{DistanceMetric, VectorStore, check_dimensions, rank};

#[derive(Debug, Default)]
struct Inner {
    records: IndexMap<String, StoredRecord>,
    dimensions: Option<usize>,
}

/// An in-memory vector store with exact nearest-neighbour search.
///
/// Writers take the lock exclusively, readers share it.
///
/// # Example
///
/// ```rust,ignore
/// use ragline::{DistanceMetric, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new(DistanceMetric::Cosine);
/// store.upsert(&records).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    metric: DistanceMetric,
    inner: RwLock<Inner>,
}

impl InMemoryVectorStore {
    /// Create an empty store that ranks by `metric`.
    pub fn new(metric: DistanceMetric) -> Self {
        Self { metric, inner: RwLock::new(Inner::default()) }
    }

    /// Dimensionality fixed by the first stored record, if any.
    pub async fn dimensions(&self) -> Option<usize> {
        self.inner.read().await.dimensions
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, records: &[StoredRecord]) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.dimensions = check_dimensions(inner.dimensions, records)?;
        for record in records {
            // IndexMap::insert keeps the slot of an existing key
            inner.records.insert(record.id.clone(), record.clone());
        }
        debug!(upserted = records.len(), total = inner.records.len(), "in-memory upsert");
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let inner = self.inner.read().await;
        if inner.records.is_empty() {
            return Err(RagError::EmptyStore);
        }
        if let Some(expected) = inner.dimensions {
            if expected != vector.len() {
                return Err(RagError::DimensionMismatch { expected, actual: vector.len() });
            }
        }
        Ok(rank(self.metric, inner.records.values(), vector, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.inner.read().await.records.len())
    }

    async fn delete(&self, ids: &[&str]) -> Result<usize> {
        let mut inner = self.inner.write().await;
        let removed = ids.iter().filter(|id| inner.records.shift_remove(**id).is_some()).count();
        if inner.records.is_empty() {
            inner.dimensions = None;
        }
        Ok(removed)
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}
