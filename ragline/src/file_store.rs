//! File-backed vector store.
//!
//! [`FileVectorStore`] keeps every record in memory and mirrors it to a
//! single JSON snapshot on disk. Each mutation rewrites the snapshot to a
//! temporary file and renames it over the previous one, so a crash leaves
//! either the old or the new snapshot, never a torn one.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::document::{SearchResult, StoredRecord};
use crate::error::{RagError, Result};
use crate::vectorstore::{DistanceMetric, VectorStore, check_dimensions, rank};

const BACKEND: &str = "file";

#[derive(Serialize)]
struct SnapshotRef<'a> {
    metric: DistanceMetric,
    dimensions: Option<usize>,
    records: Vec<&'a StoredRecord>,
}

#[derive(Deserialize)]
struct Snapshot {
    metric: DistanceMetric,
    #[serde(default)]
    dimensions: Option<usize>,
    #[serde(default)]
    records: Vec<StoredRecord>,
}

#[derive(Debug, Default)]
struct State {
    records: IndexMap<String, StoredRecord>,
    dimensions: Option<usize>,
}

/// A vector store persisted as a JSON snapshot at a fixed path.
///
/// Reopening the same path restores the same records in the same order,
/// so queries give the same results across process restarts.
///
/// # Example
///
/// ```rust,ignore
/// use ragline::{DistanceMetric, FileVectorStore, VectorStore};
///
/// let store = FileVectorStore::open("index.json", DistanceMetric::Cosine).await?;
/// store.upsert(&records).await?;
/// ```
#[derive(Debug)]
pub struct FileVectorStore {
    path: PathBuf,
    metric: DistanceMetric,
    state: RwLock<State>,
}

impl FileVectorStore {
    /// Open the snapshot at `path`, or start empty if it does not exist yet.
    ///
    /// Nothing is written until the first mutation.
    ///
    /// # Errors
    ///
    /// - [`RagError::Config`] if the snapshot was written with a different metric.
    /// - [`RagError::VectorStore`] if the file cannot be read or is corrupt.
    pub async fn open(path: impl AsRef<Path>, metric: DistanceMetric) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => load_snapshot(&path, &bytes, metric)?,
            Err(e) if e.kind() == ErrorKind::NotFound => State::default(),
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read snapshot");
                return Err(store_error(format!("cannot read {}: {e}", path.display())));
            }
        };

        info!(path = %path.display(), records = state.records.len(), %metric, "opened file vector store");
        Ok(Self { path, metric, state: RwLock::new(state) })
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `state` to a sibling temp file, then rename it over the snapshot.
    async fn persist(&self, state: &State) -> Result<()> {
        let snapshot = SnapshotRef {
            metric: self.metric,
            dimensions: state.dimensions,
            records: state.records.values().collect(),
        };
        let bytes = serde_json::to_vec(&snapshot)
            .map_err(|e| store_error(format!("failed to serialize snapshot: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| store_error(format!("cannot create {}: {e}", parent.display())))?;
        }

        let tmp = temp_path(&self.path);
        tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
            error!(path = %tmp.display(), error = %e, "failed to write snapshot");
            store_error(format!("cannot write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            error!(path = %self.path.display(), error = %e, "failed to replace snapshot");
            store_error(format!("cannot replace {}: {e}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), records = state.records.len(), bytes = bytes.len(), "snapshot written");
        Ok(())
    }
}

fn store_error(message: impl Into<String>) -> RagError {
    RagError::VectorStore { backend: BACKEND.into(), message: message.into() }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn load_snapshot(path: &Path, bytes: &[u8], metric: DistanceMetric) -> Result<State> {
    let snapshot: Snapshot = serde_json::from_slice(bytes).map_err(|e| {
        error!(path = %path.display(), error = %e, "corrupt snapshot");
        store_error(format!("corrupt snapshot {}: {e}", path.display()))
    })?;

    if snapshot.metric != metric {
        return Err(RagError::Config(format!(
            "snapshot {} was written with the {} metric, opened with {metric}",
            path.display(),
            snapshot.metric
        )));
    }

    let dimensions = check_dimensions(snapshot.dimensions, &snapshot.records)
        .map_err(|e| store_error(format!("corrupt snapshot {}: {e}", path.display())))?;
    let records = snapshot.records.into_iter().map(|r| (r.id.clone(), r)).collect();
    Ok(State { records, dimensions })
}

#[async_trait]
impl VectorStore for FileVectorStore {
    async fn upsert(&self, records: &[StoredRecord]) -> Result<()> {
        let mut state = self.state.write().await;
        let dimensions = check_dimensions(state.dimensions, records)?;

        let mut next = State { records: state.records.clone(), dimensions };
        for record in records {
            next.records.insert(record.id.clone(), record.clone());
        }
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let state = self.state.read().await;
        if state.records.is_empty() {
            return Err(RagError::EmptyStore);
        }
        if let Some(expected) = state.dimensions {
            if expected != vector.len() {
                return Err(RagError::DimensionMismatch { expected, actual: vector.len() });
            }
        }
        Ok(rank(self.metric, state.records.values(), vector, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.state.read().await.records.len())
    }

    async fn delete(&self, ids: &[&str]) -> Result<usize> {
        let mut state = self.state.write().await;
        let mut next = State { records: state.records.clone(), dimensions: state.dimensions };
        let removed = ids.iter().filter(|id| next.records.shift_remove(**id).is_some()).count();
        if removed == 0 {
            return Ok(0);
        }
        if next.records.is_empty() {
            next.dimensions = None;
        }
        self.persist(&next).await?;
        *state = next;
        Ok(removed)
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}
