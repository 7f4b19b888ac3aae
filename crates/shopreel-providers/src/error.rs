//! Provider error types.

use shopreel_poller::PollError;
use thiserror::Error;

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while talking to a third-party provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} is not configured: {detail}")]
    NotConfigured {
        provider: &'static str,
        detail: String,
    },

    #[error("{provider} returned {status}: {body}")]
    Upstream {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {detail}")]
    InvalidResponse {
        provider: &'static str,
        detail: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    pub fn not_configured(provider: &'static str, detail: impl Into<String>) -> Self {
        Self::NotConfigured {
            provider,
            detail: detail.into(),
        }
    }

    pub fn invalid_response(provider: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider,
            detail: detail.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// HTTP status reported by the provider, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ProviderError::Upstream { status, .. } => Some(*status),
            ProviderError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Upstream body text, if any.
    pub fn upstream_body(&self) -> Option<&str> {
        match self {
            ProviderError::Upstream { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Whether the same call might succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network(_) | ProviderError::Json(_) => true,
            ProviderError::InvalidResponse { .. } => true,
            ProviderError::Upstream { status, .. } => *status == 429 || *status >= 500,
            ProviderError::NotConfigured { .. } | ProviderError::InvalidInput(_) => false,
        }
    }
}

impl From<ProviderError> for PollError {
    fn from(e: ProviderError) -> Self {
        if e.is_retryable() {
            PollError::transient(e.to_string())
        } else {
            PollError::fatal(e.to_string())
        }
    }
}
