//! Status-check errors.

use thiserror::Error;

/// Error returned by a single status check.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PollError {
    /// Worth trying again on the next tick (network blip, 429, 5xx).
    #[error("{0}")]
    Transient(String),

    /// The provider rejected the check outright (bad credentials, unknown task).
    #[error("{0}")]
    Fatal(String),
}

impl PollError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, PollError::Fatal(_))
    }
}
