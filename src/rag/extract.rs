//! Text extraction from document files, plus the cleaning pass applied
//! before chunking.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Node};

use crate::core::errors::RagError;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,!?\-]").expect("valid character filter regex"));
static MISSING_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.,!?])(\w)").expect("valid punctuation spacing regex"));

const HIDDEN_ELEMENTS: [&str; 8] = [
    "script", "style", "noscript", "head", "title", "nav", "header", "footer",
];

/// Turns a file of a known format into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path, format: &str) -> Result<String, RagError>;
}

/// Local-file extractor for `pdf`, `docx`, `html` and `txt`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExtractor;

#[async_trait]
impl TextExtractor for FileExtractor {
    async fn extract(&self, path: &Path, format: &str) -> Result<String, RagError> {
        match format {
            "txt" => Ok(tokio::fs::read_to_string(path).await?),
            "html" | "htm" => {
                let raw = tokio::fs::read_to_string(path).await?;
                Ok(html_to_text(&raw))
            }
            "pdf" => {
                let owned = path.to_path_buf();
                blocking_extract(owned, |p| {
                    pdf_extract::extract_text(p).map_err(|e| e.to_string())
                })
                .await
            }
            "docx" => {
                let owned = path.to_path_buf();
                blocking_extract(owned, |p| {
                    docx_lite::extract_text(p).map_err(|e| e.to_string())
                })
                .await
            }
            other => Err(RagError::unsupported("file format", other)),
        }
    }
}

async fn blocking_extract<F>(path: PathBuf, extract: F) -> Result<String, RagError>
where
    F: FnOnce(&Path) -> Result<String, String> + Send + 'static,
{
    let task_path = path.clone();
    // Some PDF inputs make the parser panic; the join error carries it.
    let result = tokio::task::spawn_blocking(move || extract(&task_path))
        .await
        .map_err(|e| RagError::Extraction {
            path: path.clone(),
            message: format!("extractor aborted: {}", e),
        })?;

    let text = result.map_err(|message| RagError::Extraction {
        path: path.clone(),
        message,
    })?;
    tracing::debug!("Extracted {} chars from {}", text.len(), path.display());
    Ok(text)
}

/// Visible text of an HTML document. Scripts, styles and page chrome
/// (navigation, header, footer) are skipped.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|e| HIDDEN_ELEMENTS.contains(&e.name()))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(" ")
}

/// Normalizes extracted text: collapses whitespace, drops characters other
/// than word characters and `.,!?-`, and restores the space after
/// punctuation that directly precedes a word.
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text, " ");
    let filtered = DISALLOWED.replace_all(&collapsed, "");
    let spaced = MISSING_SPACE.replace_all(&filtered, "$1 $2");
    spaced.trim().to_string()
}
