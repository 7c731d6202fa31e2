//! Retrieval-augmented generation for educational content.
//!
//! Documents are extracted, cleaned, chunked and embedded into a vector
//! store; the educational layer turns retrieved content into learning paths,
//! adaptive quizzes and study materials.

pub mod core;
pub mod educational;
pub mod llm;
pub mod rag;
pub mod system;
pub mod web;

pub use crate::core::config::{load_config, SentrisConfig};
pub use crate::core::errors::RagError;
pub use system::{DocumentIngest, RagSystem};
