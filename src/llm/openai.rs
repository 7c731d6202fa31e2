use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::CompletionRequest;
use crate::core::config::LlmConfig;
use crate::core::errors::RagError;

/// Hosted backends speaking the OpenAI chat/embeddings protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    DeepSeek,
    OpenAi,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::OpenAi => "openai",
        }
    }

    fn default_api_base(&self) -> &'static str {
        match self {
            ProviderKind::DeepSeek => "https://api.deepseek.com/v1",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
        }
    }

    fn default_chat_model(&self) -> &'static str {
        match self {
            ProviderKind::DeepSeek => "deepseek-chat",
            ProviderKind::OpenAi => "gpt-4",
        }
    }

    fn default_embedding_model(&self) -> &'static str {
        match self {
            ProviderKind::DeepSeek => "deepseek-embedding",
            ProviderKind::OpenAi => "text-embedding-ada-002",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = RagError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "deepseek" => Ok(ProviderKind::DeepSeek),
            "openai" => Ok(ProviderKind::OpenAi),
            other => Err(RagError::unsupported("LLM provider", other)),
        }
    }
}

#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    kind: ProviderKind,
    api_base: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        kind: ProviderKind,
        api_key: String,
        api_base: Option<String>,
        chat_model: Option<String>,
        embedding_model: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        if api_key.trim().is_empty() {
            return Err(RagError::config(
                "llm.api_key",
                format!("{} API key is required", kind.name()),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RagError::internal)?;

        let api_base = api_base.unwrap_or_else(|| kind.default_api_base().to_string());

        Ok(Self {
            kind,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            chat_model: chat_model.unwrap_or_else(|| kind.default_chat_model().to_string()),
            embedding_model: embedding_model
                .unwrap_or_else(|| kind.default_embedding_model().to_string()),
            client,
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, RagError> {
        let url = format!("{}{}", self.api_base, path);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| RagError::provider(self.name(), e.status().map(|s| s.as_u16()), e))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::provider(self.name(), Some(status.as_u16()), text));
        }

        res.json()
            .await
            .map_err(|e| RagError::provider(self.name(), Some(status.as_u16()), e))
    }
}

/// Builds the provider variant named by `llm.provider`.
pub fn build_provider(
    config: &LlmConfig,
    embedding_model: Option<String>,
) -> Result<Arc<dyn LlmProvider>, RagError> {
    let kind: ProviderKind = config.provider.parse()?;
    let api_key = config.api_key.clone().unwrap_or_default();
    let provider = OpenAiCompatibleProvider::new(
        kind,
        api_key,
        config.api_base.clone(),
        config.model.clone(),
        embedding_model,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    tracing::info!(
        "Using {} provider (chat model {}, embedding model {})",
        kind.name(),
        provider.chat_model(),
        provider.embedding_model()
    );
    Ok(Arc::new(provider))
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        self.kind.name()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, RagError> {
        let mut body = json!({
            "model": self.chat_model,
            "messages": request.messages(),
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
            if let Some(s) = request.stop {
                obj.insert("stop".to_string(), json!(s));
            }
        }

        let payload = self.post_json("/chat/completions", &body).await?;
        parse_completion(&payload)
            .ok_or_else(|| RagError::provider(self.name(), None, "response had no message content"))
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });

        let payload = self.post_json("/embeddings", &body).await?;
        let embeddings = parse_embeddings(&payload);
        if embeddings.len() != inputs.len() {
            return Err(RagError::provider(
                self.name(),
                None,
                format!(
                    "expected {} embeddings, got {}",
                    inputs.len(),
                    embeddings.len()
                ),
            ));
        }
        Ok(embeddings)
    }
}

fn parse_completion(payload: &Value) -> Option<String> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
}

/// Embeddings in request order; `index` is honoured when the backend reorders.
fn parse_embeddings(payload: &Value) -> Vec<Vec<f32>> {
    let mut indexed: Vec<(usize, Vec<f32>)> = Vec::new();
    if let Some(data) = payload["data"].as_array() {
        for (position, item) in data.iter().enumerate() {
            if let Some(vals) = item["embedding"].as_array() {
                let vec: Vec<f32> = vals
                    .iter()
                    .filter_map(|v| v.as_f64().map(|f| f as f32))
                    .collect();
                let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(position);
                indexed.push((index, vec));
            }
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, vec)| vec).collect()
}
