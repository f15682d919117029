use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use scraper::{ElementRef, Html};
use tracing::{debug, error};

use super::{DocumentLoader, document_id, unavailable, unsupported};
use crate::document::Document;
use crate::error::Result;

const SKIPPED_TAGS: [&str; 5] = ["script", "style", "noscript", "template", "svg"];

/// Fetches a web page and keeps its visible text as one document.
///
/// Script, style and template content is dropped and whitespace inside each
/// text node is collapsed; text nodes are joined with newlines.
///
/// Metadata: `source`, `content_type`, and `title` when the page has one.
#[derive(Debug, Clone)]
pub struct WebLoader {
    url: String,
    client: reqwest::Client,
}

impl WebLoader {
    /// Create a loader for `url` with a default HTTP client.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), client: reqwest::Client::new() }
    }

    /// Use a preconfigured HTTP client (timeouts, proxy, user agent).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl DocumentLoader for WebLoader {
    async fn load(&self) -> Result<Vec<Document>> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            error!(source = %self.url, error = %e, "fetch failed");
            unavailable(&self.url, format!("request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(source = %self.url, %status, "fetch returned error status");
            return Err(unavailable(&self.url, format!("server returned {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();
        let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();

        let body = response
            .text()
            .await
            .map_err(|e| unavailable(&self.url, format!("failed to read body: {e}")))?;

        let (text, title) = match mime.as_str() {
            "text/html" | "application/xhtml+xml" => html_to_text(&body),
            m if m.starts_with("text/") => (body, None),
            other => {
                return Err(unsupported(&self.url, format!("cannot extract text from {other}")));
            }
        };

        debug!(source = %self.url, chars = text.chars().count(), "loaded web page");
        let mut document = Document::new(document_id(&self.url, 0), text)
            .with_metadata("source", self.url.as_str())
            .with_metadata("content_type", content_type)
            .with_source_uri(self.url.as_str());
        if let Some(title) = title {
            document = document.with_metadata("title", title);
        }
        Ok(vec![document])
    }

    fn source(&self) -> &str {
        &self.url
    }
}

/// Visible text of an HTML page and its `<title>`, if any.
fn html_to_text(html: &str) -> (String, Option<String>) {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let mut title = None;
    let mut lines = Vec::new();
    for node in root.descendants() {
        if let Some(element) = ElementRef::wrap(node) {
            if title.is_none() && element.value().name() == "title" {
                let text = collapse_whitespace(&element.text().collect::<String>());
                if !text.is_empty() {
                    title = Some(text);
                }
            }
            continue;
        }

        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().filter_map(ElementRef::wrap).any(|a| {
            let name = a.value().name();
            name == "title" || SKIPPED_TAGS.contains(&name)
        });
        if hidden {
            continue;
        }

        let line = collapse_whitespace(text);
        if !line.is_empty() {
            lines.push(line);
        }
    }

    (lines.join("\n"), title)
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
