//! RAG (Retrieval-Augmented Generation) module.
//!
//! This module provides:
//! - `TextChunker`: token-bounded, sentence-aligned chunking
//! - `DocumentProcessor`: extraction, cleaning and chunk metadata
//! - `KnowledgeBase`: batched embedding over a `VectorStore`

pub mod chunker;
pub mod extract;
pub mod knowledge_base;
pub mod memory;
pub mod processor;
pub mod sqlite;
pub mod store;
pub mod tokenizer;

pub use chunker::{Chunk, Chunks, TextChunker};
pub use extract::{clean_text, FileExtractor, TextExtractor};
pub use knowledge_base::{KnowledgeBase, KnowledgeBaseStats, SemanticSearch};
pub use memory::InMemoryVectorStore;
pub use processor::{ChunkMetadata, DocumentProcessor, ProcessedDocument};
pub use sqlite::SqliteVectorStore;
pub use store::{Metadata, MetadataFilter, QueryHit, StoredDocument, VectorRecord, VectorStore};
pub use tokenizer::{HfTokenizer, LexicalTokenizer, Tokenizer};
