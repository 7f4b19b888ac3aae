//! OSS configuration.

use crate::error::{StorageError, StorageResult};

/// Configuration for the OSS client.
#[derive(Debug, Clone)]
pub struct OssConfig {
    /// OSS region id, e.g. `oss-cn-hangzhou`.
    pub region: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    pub bucket: String,
    /// S3 API endpoint; defaults to `https://{region}.aliyuncs.com`.
    pub endpoint_url: String,
    /// Base for public object URLs; defaults to `https://{bucket}.{region}.aliyuncs.com`.
    pub public_base_url: String,
    /// Address objects as `{endpoint}/{bucket}/{key}`. OSS itself needs
    /// virtual-hosted requests; local S3-compatible endpoints need this on.
    pub path_style: bool,
}

impl OssConfig {
    pub fn new(
        region: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
    ) -> Self {
        let region = region.into();
        let bucket = bucket.into();
        Self {
            endpoint_url: format!("https://{region}.aliyuncs.com"),
            public_base_url: format!("https://{bucket}.{region}.aliyuncs.com"),
            region,
            bucket,
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            path_style: false,
        }
    }

    /// Point the S3 API at another endpoint, addressed path-style.
    pub fn with_local_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_url = endpoint.into().trim_end_matches('/').to_string();
        self.path_style = true;
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let required = |key: &'static str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or(StorageError::NotConfigured(key))
        };

        let mut config = Self::new(
            required("OSS_REGION")?,
            required("OSS_BUCKET")?,
            required("OSS_ACCESS_KEY_ID")?,
            required("OSS_ACCESS_KEY_SECRET")?,
        );
        if let Ok(endpoint) = std::env::var("OSS_ENDPOINT") {
            config.endpoint_url = endpoint.trim_end_matches('/').to_string();
        }
        if let Ok(base) = std::env::var("OSS_PUBLIC_BASE_URL") {
            config.public_base_url = base.trim_end_matches('/').to_string();
        }
        config.path_style = std::env::var("OSS_FORCE_PATH_STYLE")
            .is_ok_and(|v| v == "true" || v == "1");
        Ok(config)
    }

    /// Region used for request signing (`oss-cn-hangzhou` → `cn-hangzhou`).
    pub fn signing_region(&self) -> &str {
        self.region.strip_prefix("oss-").unwrap_or(&self.region)
    }

    /// Public URL of an object.
    pub fn public_url(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.public_base_url, encoded.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_public_url() {
        let config = OssConfig::new("oss-cn-hangzhou", "shopreel", "id", "secret");
        assert_eq!(
            config.public_url("gen_audio_1700000000000.mp3"),
            "https://shopreel.oss-cn-hangzhou.aliyuncs.com/gen_audio_1700000000000.mp3"
        );
        assert_eq!(
            config.public_url("uploads/u1/a b.mp4"),
            "https://shopreel.oss-cn-hangzhou.aliyuncs.com/uploads/u1/a%20b.mp4"
        );
    }

    #[test]
    fn test_signing_region() {
        let config = OssConfig::new("oss-cn-shanghai", "b", "id", "secret");
        assert_eq!(config.signing_region(), "cn-shanghai");
        assert_eq!(config.endpoint_url, "https://oss-cn-shanghai.aliyuncs.com");
        assert!(!config.path_style);

        let local = config.with_local_endpoint("http://127.0.0.1:9000/");
        assert_eq!(local.endpoint_url, "http://127.0.0.1:9000");
        assert!(local.path_style);
    }

    #[test]
    #[serial]
    fn test_from_env_requires_credentials() {
        std::env::remove_var("OSS_ACCESS_KEY_SECRET");
        std::env::set_var("OSS_REGION", "oss-cn-hangzhou");
        std::env::set_var("OSS_BUCKET", "shopreel");
        std::env::set_var("OSS_ACCESS_KEY_ID", "id");

        let err = OssConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("OSS_ACCESS_KEY_SECRET"));

        std::env::set_var("OSS_ACCESS_KEY_SECRET", "secret");
        std::env::set_var("OSS_PUBLIC_BASE_URL", "https://cdn.example.com/");
        let config = OssConfig::from_env().unwrap();
        assert_eq!(config.public_url("k.mp3"), "https://cdn.example.com/k.mp3");

        for key in [
            "OSS_REGION",
            "OSS_BUCKET",
            "OSS_ACCESS_KEY_ID",
            "OSS_ACCESS_KEY_SECRET",
            "OSS_PUBLIC_BASE_URL",
        ] {
            std::env::remove_var(key);
        }
    }
}
