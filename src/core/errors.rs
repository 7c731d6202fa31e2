use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("invalid configuration at '{setting}': {message}")]
    Configuration { setting: String, message: String },
    #[error("{collaborator} failed: {message}")]
    Retrieval {
        collaborator: String,
        message: String,
    },
    #[error("{provider} error{}: {message}", .status.map(|s| format!(" (status {})", s)).unwrap_or_default())]
    Provider {
        provider: String,
        status: Option<u16>,
        message: String,
    },
    #[error("empty input: {0}")]
    EmptyInput(String),
    #[error("no content available for '{topic}'")]
    EmptyContent { topic: String },
    #[error("unsupported {kind}: {value}")]
    UnsupportedFormat { kind: String, value: String },
    #[error("failed to extract text from {}: {message}", .path.display())]
    Extraction { path: PathBuf, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl RagError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        RagError::Internal(err.to_string())
    }

    pub fn config(setting: impl Into<String>, message: impl Into<String>) -> Self {
        RagError::Configuration {
            setting: setting.into(),
            message: message.into(),
        }
    }

    pub fn retrieval<E: std::fmt::Display>(collaborator: &str, err: E) -> Self {
        RagError::Retrieval {
            collaborator: collaborator.to_string(),
            message: err.to_string(),
        }
    }

    pub fn provider<E: std::fmt::Display>(provider: &str, status: Option<u16>, err: E) -> Self {
        RagError::Provider {
            provider: provider.to_string(),
            status,
            message: err.to_string(),
        }
    }

    pub fn unsupported(kind: &str, value: impl Into<String>) -> Self {
        RagError::UnsupportedFormat {
            kind: kind.to_string(),
            value: value.into(),
        }
    }

    /// Re-labels a collaborator failure as a retrieval failure of `collaborator`.
    ///
    /// Precondition failures and retrieval errors pass through untouched.
    pub fn into_retrieval(self, collaborator: &str) -> Self {
        match self {
            RagError::Retrieval { .. }
            | RagError::EmptyInput(_)
            | RagError::EmptyContent { .. }
            | RagError::Configuration { .. } => self,
            other => RagError::retrieval(collaborator, other),
        }
    }

    /// Whether a caller-side retry policy may reasonably retry this failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            RagError::Retrieval { .. } => true,
            RagError::Provider { status, .. } => match status {
                Some(code) => *code == 429 || *code >= 500,
                None => true,
            },
            _ => false,
        }
    }
}
