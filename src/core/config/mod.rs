pub mod service;
pub mod validation;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use service::{load_config, ConfigSource};
pub use validation::validate_config;

/// Top-level configuration. Every section falls back to its documented
/// defaults field by field, so a partial file only overrides what it names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentrisConfig {
    pub llm: LlmConfig,
    pub embeddings: EmbeddingsConfig,
    pub vector_store: VectorStoreConfig,
    pub document_processor: DocumentProcessorConfig,
    pub web_search: WebSearchConfig,
    pub retrieval: RetrievalConfig,
    pub quality: QualityConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `deepseek` or `openai`
    pub provider: String,
    /// Falls back to the provider's default chat model.
    pub model: Option<String>,
    pub api_key: Option<String>,
    /// Falls back to the provider's public endpoint.
    pub api_base: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            model: None,
            api_key: None,
            api_base: None,
            temperature: 0.7,
            max_tokens: 2000,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    /// Falls back to the provider's default embedding model.
    pub model: Option<String>,
    pub batch_size: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            model: None,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// `sqlite` (persistent) or `memory`
    pub engine: String,
    pub persist_directory: PathBuf,
    pub collection_name: String,
    pub distance_metric: String,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            engine: "sqlite".to_string(),
            persist_directory: PathBuf::from("./data/vectors"),
            collection_name: "sentris_knowledge".to_string(),
            distance_metric: "cosine".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentProcessorConfig {
    /// Chunk size in tokens
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in tokens
    pub chunk_overlap: usize,
    pub max_chunks_per_doc: usize,
    pub supported_formats: Vec<String>,
    /// Optional HuggingFace `tokenizer.json`; the lexical tokenizer is used otherwise.
    pub tokenizer_path: Option<PathBuf>,
}

impl Default for DocumentProcessorConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 50,
            max_chunks_per_doc: 1000,
            supported_formats: ["pdf", "txt", "docx", "html"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            tokenizer_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    pub default_engine: String,
    pub max_results: usize,
    /// Cache lifetime in seconds
    pub cache_duration: u64,
    /// Minimum seconds between outbound requests
    pub rate_limit_secs: f64,
    pub fetch_timeout_secs: u64,
    pub google_api_key: Option<String>,
    pub google_cx: Option<String>,
    pub brave_api_key: Option<String>,
    pub bing_api_key: Option<String>,
    pub custom_search_url: Option<String>,
    pub custom_search_api_key: Option<String>,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            default_engine: "duckduckgo".to_string(),
            max_results: 10,
            cache_duration: 3600,
            rate_limit_secs: 1.0,
            fetch_timeout_secs: 10,
            google_api_key: None,
            google_cx: None,
            brave_api_key: None,
            bing_api_key: None,
            custom_search_url: None,
            custom_search_api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results requested per goal / topic query
    pub results_per_query: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            results_per_query: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub min_quality_score: f64,
    pub readability_target: String,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_quality_score: 0.7,
            readability_target: "grade8".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
    pub directory: PathBuf,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: PathBuf::from("./data/logs"),
            file_name: "sentris.log".to_string(),
        }
    }
}
