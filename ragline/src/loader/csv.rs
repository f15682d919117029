use async_trait::async_trait;
use tracing::debug;

use super::{DocumentLoader, document_id, read_file, unsupported};
use crate::document::Document;
use crate::error::Result;

/// Loads a CSV file with a header row, one document per data row.
///
/// Each document's text lists the row's fields as `header: value` lines in
/// column order. Metadata: `source`, `row` (0-based, header excluded).
#[derive(Debug, Clone)]
pub struct CsvLoader {
    path: String,
    delimiter: u8,
}

impl CsvLoader {
    /// Create a loader for the comma-separated file at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), delimiter: b',' }
    }

    /// Use a different field delimiter, e.g. `b';'` or `b'\t'`.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn parse(&self, bytes: &[u8]) -> Result<Vec<Document>> {
        let mut reader = ::csv::ReaderBuilder::new().delimiter(self.delimiter).from_reader(bytes);
        let headers = reader
            .headers()
            .map_err(|e| unsupported(&self.path, format!("malformed CSV header: {e}")))?
            .clone();

        let mut documents = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record
                .map_err(|e| unsupported(&self.path, format!("malformed CSV row {row}: {e}")))?;
            let text = headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| format!("{}: {}", header.trim(), value.trim()))
                .collect::<Vec<_>>()
                .join("\n");

            documents.push(
                Document::new(document_id(&self.path, row), text)
                    .with_metadata("source", self.path.as_str())
                    .with_metadata("row", row)
                    .with_source_uri(self.path.as_str()),
            );
        }
        Ok(documents)
    }
}

#[async_trait]
impl DocumentLoader for CsvLoader {
    async fn load(&self) -> Result<Vec<Document>> {
        let bytes = read_file(&self.path).await?;
        let documents = self.parse(&bytes)?;
        debug!(source = %self.path, rows = documents.len(), "loaded CSV file");
        Ok(documents)
    }

    fn source(&self) -> &str {
        &self.path
    }
}
