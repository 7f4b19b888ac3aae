//! OSS client implementation.

use std::time::Instant;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use metrics::{counter, histogram};
use tracing::{debug, info};

use crate::config::OssConfig;
use crate::error::{StorageError, StorageResult};

/// Aliyun OSS storage client.
#[derive(Clone)]
pub struct OssClient {
    client: Client,
    config: OssConfig,
}

impl OssClient {
    /// Create a new client from configuration.
    pub fn new(config: OssConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.access_key_secret,
            None,
            None,
            "oss",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.signing_region().to_string()))
            .credentials_provider(credentials)
            .force_path_style(config.path_style)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            config,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(OssConfig::from_env()?))
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Public URL of an object.
    pub fn public_url(&self, key: &str) -> String {
        self.config.public_url(key)
    }

    /// Upload bytes and return the object's public URL.
    pub async fn upload_bytes(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        if key.is_empty() || key.starts_with('/') || key.split('/').any(|s| s == "..") {
            return Err(StorageError::invalid_key(key));
        }

        let size = data.len();
        debug!(key, size, "Uploading object to OSS");
        let started = Instant::now();

        let result = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await;

        let status = if result.is_ok() { "ok" } else { "error" };
        counter!("oss_uploads_total", "status" => status).increment(1);
        histogram!("oss_upload_duration_seconds").record(started.elapsed().as_secs_f64());

        result.map_err(|e| StorageError::UploadFailed {
            key: key.to_string(),
            detail: e.to_string(),
        })?;

        let url = self.public_url(key);
        info!(key, size, url = %url, "Uploaded object to OSS");
        Ok(url)
    }

    /// Check that the bucket is reachable with the configured credentials.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|e| StorageError::Unreachable {
                bucket: self.config.bucket.clone(),
                detail: e.to_string(),
            })?;
        Ok(())
    }
}
