//! Supabase error types.

use thiserror::Error;

/// Result type for Supabase operations.
pub type SupabaseResult<T> = Result<T, SupabaseError>;

/// Errors that can occur during Supabase operations.
#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Row not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Request failed ({status}): {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SupabaseError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map a PostgREST error status onto an error.
    pub fn from_http_status(status: u16, message: String, retry_after_ms: Option<u64>) -> Self {
        match status {
            401 | 403 => Self::AuthError(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            429 => Self::RateLimited(retry_after_ms.unwrap_or(1000)),
            _ => Self::RequestFailed { status, message },
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            SupabaseError::Network(e) => !e.is_builder(),
            SupabaseError::RateLimited(_) => true,
            SupabaseError::RequestFailed { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Server-requested delay before retrying.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            SupabaseError::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }

    /// HTTP status for metrics.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            SupabaseError::AuthError(_) => Some(401),
            SupabaseError::NotFound(_) => Some(404),
            SupabaseError::InvalidQuery(_) => Some(400),
            SupabaseError::Conflict(_) => Some(409),
            SupabaseError::RateLimited(_) => Some(429),
            SupabaseError::RequestFailed { status, .. } => Some(*status),
            SupabaseError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
