//! Document loaders.
//!
//! A [`DocumentLoader`] turns one source (a file path or URL) into an
//! ordered list of [`Document`]s, one per logical unit of the source:
//!
//! - [`TextLoader`] — the whole file as one document
//! - [`CsvLoader`] — one document per data row (feature `csv`)
//! - [`PdfLoader`] — one document per page (feature `pdf`)
//! - [`WebLoader`] — the visible text of a web page (feature `web`)
//!
//! [`loader_for`] picks a loader from the shape of the source descriptor.

use std::path::Path;

use async_trait::async_trait;
use tracing::error;

use crate::document::Document;
use crate::error::{RagError, Result};

#[cfg(feature = "csv")]
mod csv;
#[cfg(feature = "pdf")]
mod pdf;
mod text;
#[cfg(feature = "web")]
mod web;

#[cfg(feature = "csv")]
pub use self::csv::CsvLoader;
#[cfg(feature = "pdf")]
pub use self::pdf::PdfLoader;
pub use self::text::TextLoader;
#[cfg(feature = "web")]
pub use self::web::WebLoader;

/// Converts a raw source into documents.
///
/// Loaders only read from their source; they never modify it.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load every logical unit of the source, in source order.
    ///
    /// # Errors
    ///
    /// - [`RagError::SourceUnavailable`] if the source cannot be opened or read.
    /// - [`RagError::UnsupportedFormat`] if its content cannot be decoded into text.
    async fn load(&self) -> Result<Vec<Document>>;

    /// The source descriptor this loader reads from.
    fn source(&self) -> &str;
}

/// Pick a loader for `source`.
///
/// | Source                          | Loader        |
/// |---------------------------------|---------------|
/// | `http://…`, `https://…`         | [`WebLoader`] |
/// | `*.pdf`                         | [`PdfLoader`] |
/// | `*.csv`                         | [`CsvLoader`] |
/// | `*.txt`, `*.md`, `*.markdown`, `*.text` | [`TextLoader`] |
///
/// # Errors
///
/// [`RagError::UnsupportedFormat`] for any other extension, or when the
/// matching loader's feature is disabled.
pub fn loader_for(source: &str) -> Result<Box<dyn DocumentLoader>> {
    let lower = source.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        #[cfg(feature = "web")]
        return Ok(Box::new(WebLoader::new(source)));
        #[cfg(not(feature = "web"))]
        return Err(feature_disabled(source, "web"));
    }

    let extension = Path::new(&lower).extension().and_then(|e| e.to_str()).unwrap_or_default();
    match extension {
        "txt" | "md" | "markdown" | "text" => Ok(Box::new(TextLoader::new(source))),
        #[cfg(feature = "csv")]
        "csv" => Ok(Box::new(CsvLoader::new(source))),
        #[cfg(not(feature = "csv"))]
        "csv" => Err(feature_disabled(source, "csv")),
        #[cfg(feature = "pdf")]
        "pdf" => Ok(Box::new(PdfLoader::new(source))),
        #[cfg(not(feature = "pdf"))]
        "pdf" => Err(feature_disabled(source, "pdf")),
        "" => Err(unsupported(source, "source has no file extension")),
        other => Err(unsupported(source, format!("no loader for .{other} files"))),
    }
}

#[allow(dead_code)]
fn feature_disabled(source: &str, feature: &str) -> RagError {
    unsupported(source, format!("loader requires the `{feature}` feature"))
}

pub(crate) fn unsupported(source: &str, message: impl Into<String>) -> RagError {
    RagError::UnsupportedFormat { source_name: source.to_string(), message: message.into() }
}

pub(crate) fn unavailable(source: &str, message: impl Into<String>) -> RagError {
    RagError::SourceUnavailable { source_name: source.to_string(), message: message.into() }
}

/// `{source}#{index}`: stable across reloads of the same source.
pub(crate) fn document_id(source: &str, index: usize) -> String {
    format!("{source}#{index}")
}

/// Read a local file, mapping I/O failures to [`RagError::SourceUnavailable`].
pub(crate) async fn read_file(path: &str) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| {
        error!(source = path, error = %e, "failed to read source");
        unavailable(path, e.to_string())
    })
}
