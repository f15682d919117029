//! Vector store trait and distance metrics.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{SearchResult, StoredRecord};
use crate::error::{RagError, Result};

/// How distance between two vectors is measured. Lower is more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity`, in `[0, 2]`.
    ///
    /// A zero-magnitude vector has distance `1.0` to everything.
    #[default]
    Cosine,
    /// L2 norm of the difference.
    Euclidean,
}

impl DistanceMetric {
    /// Distance between `a` and `b`. Both slices must have the same length.
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => 1.0 - cosine_similarity(a, b),
            Self::Euclidean => {
                a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
            }
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
        })
    }
}

/// Cosine similarity. Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// A storage backend for embedded chunks with nearest-neighbour search.
///
/// Records are keyed by ID. All vectors in one store share a dimensionality,
/// fixed by the first record inserted.
///
/// # Example
///
/// ```rust,ignore
/// use ragline::{DistanceMetric, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new(DistanceMetric::Cosine);
/// store.upsert(&records).await?;
/// let results = store.query(&query_vector, 4).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace records by ID.
    ///
    /// Idempotent: upserting the same record twice leaves one copy. A
    /// replaced record keeps its original position in insertion order.
    ///
    /// # Errors
    ///
    /// [`RagError::DimensionMismatch`] if any vector's length differs from
    /// the store's dimensionality. Nothing is written in that case.
    async fn upsert(&self, records: &[StoredRecord]) -> Result<()>;

    /// Return the `k` records nearest to `vector`, nearest first.
    ///
    /// Ties are broken by insertion order. Returns `min(k, count)` results.
    ///
    /// # Errors
    ///
    /// [`RagError::EmptyStore`] when the store holds no records;
    /// [`RagError::DimensionMismatch`] when `vector` has the wrong length.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize>;

    /// Remove records by ID, returning how many existed.
    async fn delete(&self, ids: &[&str]) -> Result<usize>;

    /// The metric this store ranks by.
    fn metric(&self) -> DistanceMetric;
}

/// Check that every record has the same length as the store (or as each
/// other when the store is still empty). Returns the resulting dimensionality.
pub(crate) fn check_dimensions(
    current: Option<usize>,
    records: &[StoredRecord],
) -> Result<Option<usize>> {
    let mut dims = current;
    for record in records {
        match dims {
            Some(expected) if expected != record.vector.len() => {
                return Err(RagError::DimensionMismatch { expected, actual: record.vector.len() });
            }
            Some(_) => {}
            None => dims = Some(record.vector.len()),
        }
    }
    Ok(dims)
}

/// Rank `records` (in insertion order) by distance to `vector` and keep the first `k`.
pub(crate) fn rank<'a>(
    metric: DistanceMetric,
    records: impl Iterator<Item = &'a StoredRecord>,
    vector: &[f32],
    k: usize,
) -> Vec<SearchResult> {
    let mut scored: Vec<SearchResult> = records
        .map(|record| SearchResult {
            distance: metric.distance(&record.vector, vector),
            record: record.clone(),
        })
        .collect();

    // sort_by is stable, so equal distances keep insertion order
    scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_distance_bounds() {
        let m = DistanceMetric::Cosine;
        assert!((m.distance(&[1.0, 0.0], &[2.0, 0.0])).abs() < 1e-6);
        assert!((m.distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((m.distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert_eq!(m.distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn euclidean_distance() {
        let d = DistanceMetric::Euclidean.distance(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((d - 5.0).abs() < 1e-6);
    }

    #[test]
    fn metric_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&DistanceMetric::Euclidean).unwrap(), "\"euclidean\"");
        assert_eq!(DistanceMetric::Cosine.to_string(), "cosine");
    }
}
