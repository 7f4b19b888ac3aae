//! OSS error types.

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// A required `OSS_*` variable is missing.
    #[error("OSS is not configured: {0} not set")]
    NotConfigured(&'static str),

    #[error("Upload of {key} failed: {detail}")]
    UploadFailed { key: String, detail: String },

    /// Rejected before any request is made.
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Bucket {bucket} unreachable: {detail}")]
    Unreachable { bucket: String, detail: String },
}

impl StorageError {
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey(key.into())
    }
}
