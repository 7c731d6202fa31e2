//! Token-bounded, sentence-aligned text chunking.
//!
//! Windows of `chunk_size` tokens advance by `chunk_size - overlap` tokens.
//! A window that does not begin on a sentence is moved forward to the first
//! sentence start it contains, and a window that does not end the document
//! is cut after its last sentence terminator.

use std::ops::Range;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::tokenizer::Tokenizer;
use crate::core::config::DocumentProcessorConfig;
use crate::core::errors::RagError;

static SENTENCE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+(\w)").expect("valid sentence start regex"));

/// A chunk of source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Position among the chunks emitted for this document
    pub index: usize,
    /// Token count of `text` after trimming
    pub token_count: usize,
    pub source_file: String,
    pub file_type: String,
    /// Byte offset of `text` in the source
    pub start_offset: usize,
}

#[derive(Clone)]
pub struct TextChunker {
    tokenizer: Arc<dyn Tokenizer>,
    chunk_size: usize,
    overlap: usize,
    max_chunks: usize,
}

impl TextChunker {
    /// Fails when `overlap >= chunk_size`, since the window could never advance.
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        chunk_size: usize,
        overlap: usize,
        max_chunks: usize,
    ) -> Result<Self, RagError> {
        if chunk_size == 0 {
            return Err(RagError::config(
                "document_processor.chunk_size",
                "must be at least 1 token",
            ));
        }
        if overlap >= chunk_size {
            return Err(RagError::config(
                "document_processor.chunk_overlap",
                format!(
                    "must be smaller than chunk_size ({} >= {})",
                    overlap, chunk_size
                ),
            ));
        }
        Ok(Self {
            tokenizer,
            chunk_size,
            overlap,
            max_chunks,
        })
    }

    pub fn from_config(
        tokenizer: Arc<dyn Tokenizer>,
        config: &DocumentProcessorConfig,
    ) -> Result<Self, RagError> {
        Self::new(
            tokenizer,
            config.chunk_size,
            config.chunk_overlap,
            config.max_chunks_per_doc,
        )
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    /// Lazily chunks `text`. Tokenization happens up front; each chunk is
    /// cut when the iterator is advanced.
    pub fn chunks<'a>(
        &'a self,
        text: &'a str,
        source_file: &str,
        file_type: &str,
    ) -> Result<Chunks<'a>, RagError> {
        let spans = self.tokenizer.token_spans(text)?;
        Ok(Chunks {
            chunker: self,
            text,
            spans,
            start: 0,
            emitted: 0,
            source_file: source_file.to_string(),
            file_type: file_type.to_string(),
        })
    }

    pub fn chunk(
        &self,
        text: &str,
        source_file: &str,
        file_type: &str,
    ) -> Result<Vec<Chunk>, RagError> {
        Ok(self.chunks(text, source_file, file_type)?.collect())
    }
}

/// Iterator over the chunks of one document.
pub struct Chunks<'a> {
    chunker: &'a TextChunker,
    text: &'a str,
    spans: Vec<Range<usize>>,
    start: usize,
    emitted: usize,
    source_file: String,
    file_type: String,
}

impl Chunks<'_> {
    /// Byte range of the chunk for the token window `[start, end)`.
    fn cut(&self, start: usize, end: usize) -> Range<usize> {
        let total = self.spans.len();
        let mut lo = self.spans[start].start;
        let mut hi = self.spans[end.min(total) - 1].end;

        if !self.starts_sentence(lo) {
            if let Some(word) = SENTENCE_START
                .captures(&self.text[lo..hi])
                .and_then(|caps| caps.get(1))
            {
                lo += word.start();
            }
        }

        if end < total {
            if let Some(pos) = self.text[lo..hi].rfind(['.', '!', '?']) {
                hi = lo + pos + 1;
            }
        }

        let window = &self.text[lo..hi];
        let leading = window.len() - window.trim_start().len();
        let trimmed = window.trim();
        (lo + leading)..(lo + leading + trimmed.len())
    }

    /// True at the start of the text or right after a terminator and whitespace.
    fn starts_sentence(&self, offset: usize) -> bool {
        let before = &self.text[..offset];
        let trimmed = before.trim_end();
        trimmed.is_empty()
            || (trimmed.len() < before.len() && trimmed.ends_with(['.', '!', '?']))
    }

    fn tokens_within(&self, range: &Range<usize>) -> usize {
        let first = self.spans.partition_point(|span| span.start < range.start);
        let last = self.spans.partition_point(|span| span.end <= range.end);
        last.saturating_sub(first)
    }
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let total = self.spans.len();
        while self.start < total && self.emitted < self.chunker.max_chunks {
            let start = self.start;
            let end = start + self.chunker.chunk_size;
            self.start = end - self.chunker.overlap;

            let range = self.cut(start, end);
            if range.is_empty() {
                continue;
            }

            let chunk = Chunk {
                text: self.text[range.clone()].to_string(),
                index: self.emitted,
                token_count: self.tokens_within(&range),
                source_file: self.source_file.clone(),
                file_type: self.file_type.clone(),
                start_offset: range.start,
            };
            self.emitted += 1;
            return Some(chunk);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::tokenizer::LexicalTokenizer;

    fn chunker(size: usize, overlap: usize, max: usize) -> TextChunker {
        TextChunker::new(Arc::new(LexicalTokenizer), size, overlap, max).unwrap()
    }

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn windows_align_to_sentences() {
        let text = "A. B. C. D. E. F.";
        let chunks = chunker(4, 1, 10).chunk(text, "letters.txt", "txt").unwrap();

        assert_eq!(texts(&chunks), vec!["A. B.", "C.", "D. E.", "F."]);
        assert_eq!(chunks[0].token_count, 4);
        assert_eq!(chunks[1].token_count, 2);
        assert_eq!(chunks[2].token_count, 4);
        assert_eq!(chunks[3].token_count, 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.source_file, "letters.txt");
            assert_eq!(chunk.file_type, "txt");
            assert!(chunk.text.ends_with('.'));
            assert_eq!(
                &text[chunk.start_offset..chunk.start_offset + chunk.text.len()],
                chunk.text
            );
        }
    }

    #[test]
    fn text_without_boundaries_is_cut_by_tokens_only() {
        let chunks = chunker(2, 0, 10)
            .chunk("alpha beta gamma delta epsilon", "words", "txt")
            .unwrap();
        assert_eq!(texts(&chunks), vec!["alpha beta", "gamma delta", "epsilon"]);
    }

    #[test]
    fn max_chunks_caps_output() {
        let chunks = chunker(2, 0, 2)
            .chunk("alpha beta gamma delta epsilon", "words", "txt")
            .unwrap();
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(chunker(4, 1, 10).chunk("", "empty", "txt").unwrap().is_empty());
        assert!(chunker(4, 1, 10).chunk("  \n\t ", "blank", "txt").unwrap().is_empty());
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let err = TextChunker::new(Arc::new(LexicalTokenizer), 4, 4, 10).err().unwrap();
        assert!(matches!(err, RagError::Configuration { .. }));

        let err = TextChunker::new(Arc::new(LexicalTokenizer), 0, 0, 10).err().unwrap();
        assert!(matches!(err, RagError::Configuration { .. }));
    }

    #[test]
    fn chunks_are_produced_lazily() {
        let text = "One two. Three four. Five six. Seven eight.";
        let chunker = chunker(3, 1, 100);
        let mut iter = chunker.chunks(text, "doc", "txt").unwrap();

        let first = iter.next().unwrap();
        assert_eq!(first.text, "One two.");
        let rest: Vec<Chunk> = iter.collect();
        assert!(!rest.is_empty());
        assert_eq!(rest[0].index, 1);
    }

    #[test]
    fn consecutive_chunks_leave_no_wide_gaps() {
        let text = "Rust has ownership. Borrowing is checked at compile time. \
                    Lifetimes describe scopes. Traits describe behaviour. \
                    Generics are monomorphised. Macros expand before type checking.";
        let chunks = chunker(12, 4, 100).chunk(text, "rust", "txt").unwrap();

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let prev_end = pair[0].start_offset + pair[0].text.len();
            let gap = text[prev_end.min(pair[1].start_offset)..pair[1].start_offset].to_string();
            let gap_tokens = LexicalTokenizer.count_tokens(&gap).unwrap();
            assert!(gap_tokens <= 4, "gap too wide: {gap:?}");
        }
    }

    #[test]
    fn window_starting_on_a_sentence_keeps_it() {
        let text = "A. B. C. D. E. F.";
        let chunks = chunker(4, 1, 10).chunk(text, "letters.txt", "txt").unwrap();

        for pair in chunks.windows(2) {
            let prev_end = pair[0].start_offset + pair[0].text.len();
            let gap = &text[prev_end.min(pair[1].start_offset)..pair[1].start_offset];
            assert!(
                LexicalTokenizer.count_tokens(gap).unwrap() <= 1,
                "gap {gap:?} wider than the overlap"
            );
        }
        assert!(chunks.iter().any(|c| c.text.starts_with("D.")));
    }
}
