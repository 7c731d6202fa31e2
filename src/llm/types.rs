use serde::{Deserialize, Serialize};

use crate::core::config::LlmConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub stop: Option<Vec<String>>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
            stop: None,
        }
    }

    /// Fills unset sampling parameters from the configured defaults.
    pub fn with_config(mut self, config: &LlmConfig) -> Self {
        self.temperature = self.temperature.or(Some(config.temperature));
        self.max_tokens = self.max_tokens.or(Some(config.max_tokens));
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub(crate) fn messages(&self) -> Vec<ChatMessage> {
        vec![ChatMessage {
            role: "user".to_string(),
            content: self.prompt.clone(),
        }]
    }
}
