use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::validation::validate_config;
use super::SentrisConfig;
use crate::core::errors::RagError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 3] = ["max_tokens", "token_count", "tokenizer_path"];

/// Where a configuration was resolved from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

/// Loads configuration from `path`, or `SENTRIS_CONFIG_PATH` when no path is
/// given, then applies environment overrides and validates the result.
///
/// A missing file is not an error: defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<(SentrisConfig, ConfigSource), RagError> {
    let resolved = path
        .map(Path::to_path_buf)
        .or_else(|| env::var("SENTRIS_CONFIG_PATH").ok().map(PathBuf::from));

    let (mut config, source) = match resolved {
        Some(path) if path.exists() => (parse_config_file(&path)?, ConfigSource::File(path)),
        Some(path) => {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            (SentrisConfig::default(), ConfigSource::Defaults)
        }
        None => (SentrisConfig::default(), ConfigSource::Defaults),
    };

    apply_env_overrides(&mut config);
    validate_config(&config)?;
    Ok((config, source))
}

fn parse_config_file(path: &Path) -> Result<SentrisConfig, RagError> {
    let contents = fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "toml" => toml::from_str(&contents)
            .map_err(|e| RagError::config(path.display().to_string(), e.to_string())),
        "yml" | "yaml" => serde_yaml::from_str(&contents)
            .map_err(|e| RagError::config(path.display().to_string(), e.to_string())),
        other => Err(RagError::unsupported("config format", other)),
    }
}

fn apply_env_overrides(config: &mut SentrisConfig) {
    if let Some(key) = non_empty_env("SENTRIS_LLM_API_KEY") {
        config.llm.api_key = Some(key);
    }
    if let Some(provider) = non_empty_env("SENTRIS_LLM_PROVIDER") {
        config.llm.provider = provider;
    }
    if let Some(dir) = non_empty_env("SENTRIS_DATA_DIR") {
        let base = PathBuf::from(dir);
        config.vector_store.persist_directory = base.join("vectors");
        config.logging.directory = base.join("logs");
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl SentrisConfig {
    /// JSON rendering with credentials masked, for logging the effective config.
    pub fn redacted(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(value) => redact_sensitive_values(&value),
            Err(_) => Value::Object(Map::new()),
        }
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}
