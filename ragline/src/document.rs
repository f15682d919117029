//! Data types for documents, chunks, stored records and search results.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// A boolean flag.
    Bool(bool),
    /// An integer such as a page or row number.
    Integer(i64),
    /// A floating-point number.
    Float(f64),
    /// Free text such as a source path or URL.
    String(String),
}

impl MetadataValue {
    /// Return the value as a string slice if it is a [`MetadataValue::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Return the value as an integer if it is a [`MetadataValue::Integer`].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Key-value metadata attached to documents and chunks.
pub type Metadata = HashMap<String, MetadataValue>;

/// One logical unit of a source (a page, a row, a fetched web page).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Loader-specific metadata (page number, row index, source URL, ...).
    #[serde(default)]
    pub metadata: Metadata,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with empty metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: Metadata::new(), source_uri: None }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the source URI.
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }
}

/// A bounded span of a [`Document`]'s text: the unit of embedding and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier, `{document_id}_{chunk_index}`.
    pub id: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// A contiguous substring of the parent document's text.
    pub text: String,
    /// Metadata inherited from the parent document plus `chunk_index` and `start_index`.
    pub metadata: Metadata,
}

/// A chunk paired with its embedding, as held by a vector store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRecord {
    /// Unique record identifier; equal to the chunk ID.
    pub id: String,
    /// The embedded chunk.
    pub chunk: Chunk,
    /// The embedding of `chunk.text`.
    pub vector: Vec<f32>,
}

impl StoredRecord {
    /// Pair a chunk with its embedding; the record takes the chunk's ID.
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self { id: chunk.id.clone(), chunk, vector }
    }
}

/// A retrieved [`StoredRecord`] with its distance to the query vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved record.
    pub record: StoredRecord,
    /// Distance to the query (lower is more similar).
    pub distance: f32,
}

impl SearchResult {
    /// The retrieved chunk's text.
    pub fn text(&self) -> &str {
        &self.record.chunk.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_serializes_as_plain_scalars() {
        let doc = Document::new("d", "text")
            .with_metadata("page", 3usize)
            .with_metadata("source", "paper.pdf")
            .with_metadata("score", 0.5)
            .with_metadata("ocr", false);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["metadata"]["page"], 3);
        assert_eq!(json["metadata"]["source"], "paper.pdf");
        assert_eq!(json["metadata"]["ocr"], false);

        let back: Document = serde_json::from_value(json).unwrap();
        assert_eq!(back.metadata["page"], MetadataValue::Integer(3));
        assert_eq!(back.metadata["score"], MetadataValue::Float(0.5));
    }

    #[test]
    fn stored_record_takes_chunk_id() {
        let chunk = Chunk {
            id: "doc_0".into(),
            document_id: "doc".into(),
            text: "hello".into(),
            metadata: Metadata::new(),
        };
        let record = StoredRecord::new(chunk, vec![1.0, 0.0]);
        assert_eq!(record.id, "doc_0");
    }
}
