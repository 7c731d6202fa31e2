//! Document ingestion: format check, extraction, cleaning, chunking and
//! per-chunk metadata.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::chunker::{Chunk, TextChunker};
use super::extract::{clean_text, FileExtractor, TextExtractor};
use super::store::Metadata;
use super::tokenizer::{HfTokenizer, LexicalTokenizer, Tokenizer};
use crate::core::config::DocumentProcessorConfig;
use crate::core::errors::RagError;

/// File type recorded for text that did not come from a local file.
pub const WEB_FILE_TYPE: &str = "web";

/// Bookkeeping stored next to every chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkMetadata {
    pub doc_id: String,
    pub source_file: String,
    pub file_type: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// Length of the chunk text in characters
    pub chunk_size: usize,
    pub token_count: usize,
}

impl ChunkMetadata {
    /// Caller metadata overlaid with the chunk bookkeeping; bookkeeping keys win.
    pub fn merged_with(&self, extra: &Metadata) -> Metadata {
        let mut merged = extra.clone();
        if let Ok(Value::Object(own)) = serde_json::to_value(self) {
            merged.extend(own);
        }
        merged
    }
}

/// Chunks of one ingested document with their store metadata.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub doc_id: String,
    pub source_file: String,
    pub chunks: Vec<Chunk>,
    pub metadata: Vec<Metadata>,
}

impl ProcessedDocument {
    /// Store ids, `{doc_id}_{chunk_index}`.
    pub fn chunk_ids(&self) -> Vec<String> {
        self.chunks
            .iter()
            .map(|chunk| format!("{}_{}", self.doc_id, chunk.index))
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.chunks.iter().map(|chunk| chunk.text.clone()).collect()
    }
}

pub struct DocumentProcessor {
    extractor: Arc<dyn TextExtractor>,
    chunker: TextChunker,
    supported_formats: Vec<String>,
}

impl DocumentProcessor {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        chunker: TextChunker,
        supported_formats: Vec<String>,
    ) -> Self {
        Self {
            extractor,
            chunker,
            supported_formats: supported_formats
                .into_iter()
                .map(|f| f.trim().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Local-file extraction with the configured tokenizer.
    pub fn from_config(config: &DocumentProcessorConfig) -> Result<Self, RagError> {
        let tokenizer: Arc<dyn Tokenizer> = match &config.tokenizer_path {
            Some(path) => Arc::new(HfTokenizer::from_file(path)?),
            None => Arc::new(LexicalTokenizer),
        };
        tracing::debug!("Chunking with the {} tokenizer", tokenizer.name());
        let chunker = TextChunker::from_config(tokenizer, config)?;
        Ok(Self::new(
            Arc::new(FileExtractor),
            chunker,
            config.supported_formats.clone(),
        ))
    }

    pub fn supports(&self, format: &str) -> bool {
        let format = format.to_lowercase();
        self.supported_formats.iter().any(|f| *f == format)
    }

    pub async fn process_file(
        &self,
        path: &Path,
        extra: &Metadata,
    ) -> Result<ProcessedDocument, RagError> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if !self.supports(&format) {
            return Err(RagError::unsupported("file format", format));
        }

        let raw = self.extractor.extract(path, &format).await?;
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.build(&raw, &source, &format, extra)
    }

    /// Same pipeline for in-memory text such as fetched web pages.
    pub fn process_text(
        &self,
        text: &str,
        source: &str,
        extra: &Metadata,
    ) -> Result<ProcessedDocument, RagError> {
        self.build(text, source, WEB_FILE_TYPE, extra)
    }

    fn build(
        &self,
        raw: &str,
        source: &str,
        file_type: &str,
        extra: &Metadata,
    ) -> Result<ProcessedDocument, RagError> {
        let cleaned = clean_text(raw);
        let chunks = self.chunker.chunk(&cleaned, source, file_type)?;
        if chunks.is_empty() {
            return Err(RagError::EmptyInput(format!("no text extracted from {}", source)));
        }

        let doc_id = uuid::Uuid::new_v4().to_string();
        let total_chunks = chunks.len();
        let metadata = chunks
            .iter()
            .map(|chunk| {
                ChunkMetadata {
                    doc_id: doc_id.clone(),
                    source_file: source.to_string(),
                    file_type: file_type.to_string(),
                    chunk_index: chunk.index,
                    total_chunks,
                    chunk_size: chunk.text.chars().count(),
                    token_count: chunk.token_count,
                }
                .merged_with(extra)
            })
            .collect();

        tracing::debug!("Processed {} into {} chunks", source, total_chunks);
        Ok(ProcessedDocument {
            doc_id,
            source_file: source.to_string(),
            chunks,
            metadata,
        })
    }
}
