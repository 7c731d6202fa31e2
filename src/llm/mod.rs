pub mod openai;
pub mod provider;
pub mod types;

pub use openai::{build_provider, OpenAiCompatibleProvider, ProviderKind};
pub use provider::{Embedder, LlmProvider, ProviderEmbedder};
pub use types::CompletionRequest;
