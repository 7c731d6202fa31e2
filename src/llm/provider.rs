use std::sync::Arc;

use async_trait::async_trait;

use super::types::CompletionRequest;
use crate::core::errors::RagError;

/// Text-generation backend with an embedding endpoint.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// provider name (e.g. "deepseek", "openai")
    fn name(&self) -> &str;

    /// single-turn completion
    async fn complete(&self, request: CompletionRequest) -> Result<String, RagError>;

    /// embed a batch of inputs, one vector per input
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}

/// Batch text embedder used by the knowledge base.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}

/// Exposes a provider's embedding endpoint as an [`Embedder`].
#[derive(Clone)]
pub struct ProviderEmbedder {
    provider: Arc<dyn LlmProvider>,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.provider.embed(texts).await?;
        if vectors.len() != texts.len() {
            return Err(RagError::provider(
                self.provider.name(),
                None,
                format!(
                    "embedding count mismatch: {} != {}",
                    vectors.len(),
                    texts.len()
                ),
            ));
        }
        Ok(vectors)
    }
}
