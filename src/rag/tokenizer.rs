//! Tokenizers used to measure chunk budgets.
//!
//! Tokens are reported as byte spans into the source text, so a window of
//! tokens decodes back to an exact slice of the input.

use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::errors::RagError;

static LEXICAL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+|[^\w\s]").expect("valid lexical token regex"));

pub trait Tokenizer: Send + Sync {
    fn name(&self) -> &str;

    /// Byte ranges of every token in `text`, in order and non-overlapping.
    fn token_spans(&self, text: &str) -> Result<Vec<Range<usize>>, RagError>;

    fn count_tokens(&self, text: &str) -> Result<usize, RagError> {
        Ok(self.token_spans(text)?.len())
    }
}

/// Words and individual punctuation marks; whitespace is never a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalTokenizer;

impl Tokenizer for LexicalTokenizer {
    fn name(&self) -> &str {
        "lexical"
    }

    fn token_spans(&self, text: &str) -> Result<Vec<Range<usize>>, RagError> {
        Ok(LEXICAL_TOKEN.find_iter(text).map(|m| m.range()).collect())
    }
}

/// Adapter over a HuggingFace `tokenizer.json`.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    name: String,
}

impl HfTokenizer {
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| RagError::Extraction {
            path: path.to_path_buf(),
            message: format!("failed to load tokenizer: {}", e),
        })?;
        Ok(Self {
            inner,
            name: format!("hf:{}", path.display()),
        })
    }
}

impl Tokenizer for HfTokenizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn token_spans(&self, text: &str) -> Result<Vec<Range<usize>>, RagError> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| RagError::internal(format!("tokenization failed: {}", e)))?;

        let mut spans: Vec<Range<usize>> = Vec::with_capacity(encoding.len());
        let mut cursor = 0usize;
        for &(start, end) in encoding.get_offsets() {
            // Byte-level models can split a multi-byte character across tokens.
            let start = floor_char_boundary(text, start.max(cursor));
            let end = ceil_char_boundary(text, end.min(text.len()));
            if start >= end || start < cursor {
                continue;
            }
            spans.push(start..end);
            cursor = end;
        }
        Ok(spans)
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index.min(text.len())
}
