use async_trait::async_trait;
use tracing::{debug, warn};

use super::{DocumentLoader, document_id, read_file, unsupported};
use crate::document::Document;
use crate::error::Result;

/// Loads a PDF file, one document per page.
///
/// Metadata: `source`, `page` (0-based), `total_pages`.
#[derive(Debug, Clone)]
pub struct PdfLoader {
    path: String,
}

impl PdfLoader {
    /// Create a loader for the PDF at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    fn parse(&self, bytes: &[u8]) -> Result<Vec<Document>> {
        let pdf = lopdf::Document::load_mem(bytes)
            .map_err(|e| unsupported(&self.path, format!("unparsable PDF: {e}")))?;
        if pdf.is_encrypted() {
            return Err(unsupported(&self.path, "encrypted PDF"));
        }

        let pages = pdf.get_pages();
        let total_pages = pages.len();
        let mut documents = Vec::with_capacity(total_pages);

        for (index, page_number) in pages.keys().enumerate() {
            let text = pdf.extract_text(&[*page_number]).map_err(|e| {
                unsupported(&self.path, format!("cannot extract text from page {page_number}: {e}"))
            })?;
            if text.trim().is_empty() {
                warn!(source = %self.path, page = index, "page has no extractable text");
            }

            documents.push(
                Document::new(document_id(&self.path, index), text)
                    .with_metadata("source", self.path.as_str())
                    .with_metadata("page", index)
                    .with_metadata("total_pages", total_pages)
                    .with_source_uri(self.path.as_str()),
            );
        }
        Ok(documents)
    }
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    async fn load(&self) -> Result<Vec<Document>> {
        let bytes = read_file(&self.path).await?;
        let documents = self.parse(&bytes)?;
        debug!(source = %self.path, pages = documents.len(), "loaded PDF file");
        Ok(documents)
    }

    fn source(&self) -> &str {
        &self.path
    }
}
