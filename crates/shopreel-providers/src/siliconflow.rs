//! SiliconFlow speech-to-text.

use std::time::Duration;

use reqwest::header::USER_AGENT;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use crate::apihz::BROWSER_UA;
use crate::error::{ProviderError, ProviderResult};
use crate::http::{build_client, env_opt, env_secs, json_body, send, truncate};

const PROVIDER: &str = "siliconflow";

/// Default transcription model.
pub const TRANSCRIBE_MODEL: &str = "FunAudioLLM/SenseVoiceSmall";

/// SiliconFlow configuration.
#[derive(Debug, Clone)]
pub struct SiliconFlowConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Limit for fetching the source video.
    pub download_timeout: Duration,
    pub timeout: Duration,
}

impl SiliconFlowConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.siliconflow.cn".to_string(),
            model: TRANSCRIBE_MODEL.to_string(),
            download_timeout: Duration::from_secs(30),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_env() -> ProviderResult<Self> {
        let api_key = env_opt("SILICONFLOW_API_KEY")
            .ok_or_else(|| ProviderError::not_configured(PROVIDER, "SILICONFLOW_API_KEY not set"))?;
        let mut config = Self::new(api_key);
        if let Some(base_url) = env_opt("SILICONFLOW_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        config.download_timeout = env_secs("TRANSCRIBE_DOWNLOAD_TIMEOUT_SECS", 30);
        config.timeout = env_secs("SILICONFLOW_TIMEOUT_SECS", 120);
        Ok(config)
    }
}

/// Downloads a video and transcribes its audio track.
#[derive(Clone)]
pub struct SiliconFlowClient {
    http: Client,
    download: Client,
    config: SiliconFlowConfig,
}

impl SiliconFlowClient {
    pub fn new(config: SiliconFlowConfig) -> ProviderResult<Self> {
        Ok(Self {
            http: build_client(config.timeout)?,
            download: build_client(config.download_timeout)?,
            config,
        })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(SiliconFlowConfig::from_env()?)
    }

    /// Fetch `video_url` and return its transcript.
    pub async fn transcribe_url(&self, video_url: &str) -> ProviderResult<String> {
        let request = self.download.get(video_url).header(USER_AGENT, BROWSER_UA);
        let media = send(PROVIDER, "download", request).await?.bytes().await?.to_vec();
        info!(bytes = media.len(), "Video downloaded for transcription");
        self.transcribe_bytes(media).await
    }

    /// Transcribe an in-memory media file.
    pub async fn transcribe_bytes(&self, media: Vec<u8>) -> ProviderResult<String> {
        if media.is_empty() {
            return Err(ProviderError::invalid_input("media file is empty"));
        }
        // SenseVoice accepts the MP4 container when labelled as MP3 audio.
        let file = Part::bytes(media)
            .file_name("audio.mp3")
            .mime_str("audio/mpeg")?;
        let form = Form::new()
            .part("file", file)
            .text("model", self.config.model.clone());

        let request = self
            .http
            .post(format!("{}/v1/audio/transcriptions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .multipart(form);
        let response = send(PROVIDER, "transcribe", request).await?;
        let value = json_body(PROVIDER, response).await?;

        match value.get("text").and_then(Value::as_str).filter(|s| !s.is_empty()) {
            Some(text) => {
                info!(chars = text.chars().count(), "Transcription complete");
                Ok(text.to_string())
            }
            None => Err(ProviderError::invalid_response(
                PROVIDER,
                format!("no transcript in reply: {}", truncate(&value.to_string(), 300)),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_transcribe_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 0, 0, 24, 102, 116, 121, 112]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .and(body_string_contains("FunAudioLLM/SenseVoiceSmall"))
            .and(body_string_contains("filename=\"audio.mp3\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "家人们今天教大家做一碗面" })))
            .mount(&server)
            .await;

        let client = SiliconFlowClient::new(SiliconFlowConfig::new("sk").with_base_url(server.uri())).unwrap();
        let text = client
            .transcribe_url(&format!("{}/media/clip.mp4", server.uri()))
            .await
            .unwrap();
        assert_eq!(text, "家人们今天教大家做一碗面");
    }

    #[tokio::test]
    async fn test_download_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/gone.mp4"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = SiliconFlowClient::new(SiliconFlowConfig::new("sk").with_base_url(server.uri())).unwrap();
        let err = client
            .transcribe_url(&format!("{}/media/gone.mp4", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), Some(403));
    }

    #[tokio::test]
    async fn test_missing_text_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 20015 })))
            .mount(&server)
            .await;

        let client = SiliconFlowClient::new(SiliconFlowConfig::new("sk").with_base_url(server.uri())).unwrap();
        let err = client.transcribe_bytes(vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse { .. }));
    }
}
