use async_trait::async_trait;
use tracing::debug;

use super::{DocumentLoader, document_id, read_file, unsupported};
use crate::document::Document;
use crate::error::Result;

/// Loads a UTF-8 text file as a single document.
///
/// Metadata: `source`.
#[derive(Debug, Clone)]
pub struct TextLoader {
    path: String,
}

impl TextLoader {
    /// Create a loader for the file at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentLoader for TextLoader {
    async fn load(&self) -> Result<Vec<Document>> {
        let bytes = read_file(&self.path).await?;
        let text = String::from_utf8(bytes)
            .map_err(|e| unsupported(&self.path, format!("not valid UTF-8: {e}")))?;

        debug!(source = %self.path, chars = text.chars().count(), "loaded text file");
        Ok(vec![
            Document::new(document_id(&self.path, 0), text)
                .with_metadata("source", self.path.as_str())
                .with_source_uri(self.path.as_str()),
        ])
    }

    fn source(&self) -> &str {
        &self.path
    }
}
