//! DashScope client: CosyVoice TTS, VideoRetalk and voice cloning.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use shopreel_models::{JobId, JobState, StatusReport};
use shopreel_poller::{JobStatusSource, PollError};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::http::{build_client, env_opt, env_secs, json_body, send, truncate};

const PROVIDER: &str = "dashscope";

/// Default TTS model.
pub const DEFAULT_TTS_MODEL: &str = "cosyvoice-v3-plus";

const RETALK_MODEL: &str = "videoretalk";
const TTS_SAMPLE_RATE: u32 = 24_000;

/// DashScope configuration.
#[derive(Debug, Clone)]
pub struct DashScopeConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl DashScopeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://dashscope.aliyuncs.com".to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Load from `DASHSCOPE_API_KEY`, `DASHSCOPE_BASE_URL` and `DASHSCOPE_TIMEOUT_SECS`.
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = env_opt("DASHSCOPE_API_KEY")
            .ok_or_else(|| ProviderError::not_configured(PROVIDER, "DASHSCOPE_API_KEY not set"))?;
        let mut config = Self::new(api_key);
        if let Some(base_url) = env_opt("DASHSCOPE_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        config.timeout = env_secs("DASHSCOPE_TIMEOUT_SECS", 120);
        Ok(config)
    }
}

/// DashScope REST client.
#[derive(Clone)]
pub struct DashScopeClient {
    http: Client,
    config: DashScopeConfig,
}

impl DashScopeClient {
    pub fn new(config: DashScopeConfig) -> ProviderResult<Self> {
        Ok(Self {
            http: build_client(config.timeout)?,
            config,
        })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(DashScopeConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Synthesize speech and return the MP3 bytes.
    pub async fn synthesize_speech(
        &self,
        text: &str,
        voice: &str,
        model: Option<&str>,
    ) -> ProviderResult<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(ProviderError::invalid_input("text is empty after preprocessing"));
        }
        let model = model.unwrap_or(DEFAULT_TTS_MODEL);
        debug!(model, voice, chars = text.chars().count(), "Synthesizing speech");

        let body = json!({
            "model": model,
            "input": { "text": text },
            "parameters": {
                "voice": voice,
                "format": "mp3",
                "sample_rate": TTS_SAMPLE_RATE,
            }
        });

        let request = self
            .http
            .post(self.url("/api/v1/services/audio/tts/synthesis"))
            .bearer_auth(&self.config.api_key)
            .header("X-DashScope-Data-Inspection", "enable")
            .json(&body);
        let response = send(PROVIDER, "tts", request).await?;

        // Errors sometimes arrive as a 200 with a JSON body instead of audio.
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));
        if is_json {
            let text = response.text().await?;
            return Err(ProviderError::invalid_response(
                PROVIDER,
                format!("expected audio, got JSON: {}", truncate(&text, 300)),
            ));
        }

        let audio = response.bytes().await?.to_vec();
        if audio.is_empty() {
            return Err(ProviderError::invalid_response(PROVIDER, "empty audio body"));
        }
        info!(bytes = audio.len(), "Speech synthesized");
        Ok(audio)
    }

    /// Submit a VideoRetalk lip-sync job.
    pub async fn submit_retalk(&self, video_url: &str, audio_url: &str) -> ProviderResult<JobId> {
        let body = json!({
            "model": RETALK_MODEL,
            "input": { "video_url": video_url, "audio_url": audio_url },
            "parameters": { "video_extension": false }
        });
        let request = self
            .http
            .post(self.url("/api/v1/services/aigc/image2video/video-synthesis"))
            .bearer_auth(&self.config.api_key)
            .header("X-DashScope-Async", "enable")
            .json(&body);
        let response = send(PROVIDER, "retalk_submit", request).await?;
        let value = json_body(PROVIDER, response).await?;

        let task_id = value
            .pointer("/output/task_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "missing output.task_id"))?;
        info!(task_id, "VideoRetalk job submitted");
        Ok(JobId::from_string(task_id))
    }

    /// Raw task document, as DashScope returns it.
    pub async fn task(&self, task_id: &str) -> ProviderResult<Value> {
        let request = self
            .http
            .get(self.url(&format!("/api/v1/tasks/{}", urlencode_segment(task_id))))
            .bearer_auth(&self.config.api_key);
        let response = send(PROVIDER, "task_status", request).await?;
        json_body(PROVIDER, response).await
    }

    /// Enroll a cloned voice from a sample recording and return its voice id.
    pub async fn enroll_voice(&self, prefix: &str, audio_url: &str) -> ProviderResult<String> {
        let body = json!({
            "model": DEFAULT_TTS_MODEL,
            "input": { "prefix": prefix, "url": audio_url },
            "parameters": { "language_hints": ["zh"] }
        });
        let request = self
            .http
            .post(self.url("/api/v1/services/audio/voice-cloning/enroll"))
            .bearer_auth(&self.config.api_key)
            .json(&body);
        let response = send(PROVIDER, "voice_enroll", request).await?;
        let value = json_body(PROVIDER, response).await?;

        let voice_id = value
            .pointer("/output/voice_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "missing output.voice_id"))?;
        info!(voice_id, "Voice enrolled");
        Ok(voice_id.to_string())
    }
}

#[async_trait]
impl JobStatusSource for DashScopeClient {
    async fn check_status(&self, job_id: &JobId) -> Result<StatusReport, PollError> {
        let value = self.task(job_id.as_str()).await?;
        Ok(parse_task_status(&value)?)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

/// Map a DashScope task document onto a [`StatusReport`].
///
/// Only `FAILED` and `CANCELED` end the job unsuccessfully; statuses this
/// client does not know keep the job running. A document without
/// `output.task_status` is an invalid response, which the poller retries.
pub fn parse_task_status(value: &Value) -> ProviderResult<StatusReport> {
    let output = value.get("output").unwrap_or(&Value::Null);
    let status = output
        .get("task_status")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "missing output.task_status"))?;

    let report = match status {
        "PENDING" => StatusReport::pending(),
        "SUCCEEDED" => {
            let url = output
                .get("video_url")
                .and_then(Value::as_str)
                .or_else(|| output.pointer("/results/0/url").and_then(Value::as_str));
            match url {
                Some(url) => StatusReport::succeeded(url),
                // the poller treats a URL-less success as a failure
                None => StatusReport {
                    state: JobState::Succeeded,
                    result_url: None,
                    error_message: None,
                },
            }
        }
        "FAILED" | "CANCELED" => StatusReport::failed(
            output
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("task {}", status.to_lowercase())),
        ),
        other => {
            if !matches!(other, "RUNNING" | "SUSPENDED") {
                debug!(status = other, "Unrecognized DashScope task status, still polling");
            }
            StatusReport::running()
        }
    };
    Ok(report)
}

fn urlencode_segment(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopreel_poller::{JobPoller, PollConfig, PollOutcome};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> DashScopeClient {
        DashScopeClient::new(DashScopeConfig::new("sk-test").with_base_url(server.uri())).unwrap()
    }

    #[test]
    fn test_parse_task_status_states() {
        let state = |s: &str| {
            parse_task_status(&json!({ "output": { "task_status": s } }))
                .unwrap()
                .state
        };
        assert_eq!(state("PENDING"), JobState::Pending);
        assert_eq!(state("RUNNING"), JobState::Running);
        assert_eq!(state("SUSPENDED"), JobState::Running);
        assert_eq!(state("UNKNOWN"), JobState::Running);
        assert_eq!(state("FAILED"), JobState::Failed);
        assert_eq!(state("CANCELED"), JobState::Failed);

        let err = parse_task_status(&json!({ "request_id": "r" })).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_parse_task_status_result_url() {
        let direct = json!({ "output": { "task_status": "SUCCEEDED", "video_url": "https://v/1.mp4" } });
        assert_eq!(
            parse_task_status(&direct).unwrap().result_url.as_deref(),
            Some("https://v/1.mp4")
        );

        let nested = json!({ "output": { "task_status": "SUCCEEDED", "results": [{ "url": "https://v/2.mp4" }] } });
        assert_eq!(
            parse_task_status(&nested).unwrap().result_url.as_deref(),
            Some("https://v/2.mp4")
        );

        let failed = json!({ "output": { "task_status": "FAILED", "message": "face not found" } });
        let report = parse_task_status(&failed).unwrap();
        assert_eq!(report.state, JobState::Failed);
        assert_eq!(report.error_message.as_deref(), Some("face not found"));
    }

    #[tokio::test]
    async fn test_submit_retalk() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/services/aigc/image2video/video-synthesis"))
            .and(header("X-DashScope-Async", "enable"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "videoretalk" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "request_id": "r1",
                "output": { "task_id": "task-42", "task_status": "PENDING" }
            })))
            .mount(&server)
            .await;

        let id = client(&server)
            .await
            .submit_retalk("https://v/base.mp4", "https://a/x.mp3")
            .await
            .unwrap();
        assert_eq!(id.as_str(), "task-42");
    }

    #[tokio::test]
    async fn test_tts_returns_audio_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/services/audio/tts/synthesis"))
            .and(body_partial_json(json!({ "parameters": { "voice": "longcheng", "format": "mp3" } })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "audio/mpeg")
                    .set_body_bytes(vec![0xFF, 0xFB, 0x90, 0x00]),
            )
            .mount(&server)
            .await;

        let audio = client(&server)
            .await
            .synthesize_speech("欢迎光临", "longcheng", None)
            .await
            .unwrap();
        assert_eq!(audio, vec![0xFF, 0xFB, 0x90, 0x00]);
    }

    #[tokio::test]
    async fn test_tts_json_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/services/audio/tts/synthesis"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": "InvalidParameter" })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .synthesize_speech("你好", "longcheng", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_upstream_error_surfaces_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/services/audio/tts/synthesis"))
            .respond_with(ResponseTemplate::new(400).set_body_string("{\"message\":\"bad voice\"}"))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .synthesize_speech("你好", "nope", None)
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), Some(400));
        assert!(err.upstream_body().unwrap().contains("bad voice"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_check_status_as_poll_source() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/tasks/task-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output": { "task_status": "SUCCEEDED", "video_url": "https://v/done.mp4" }
            })))
            .mount(&server)
            .await;

        let report = client(&server)
            .await
            .check_status(&JobId::from_string("task-7"))
            .await
            .unwrap();
        assert_eq!(report.state, JobState::Succeeded);
        assert_eq!(report.result_url.as_deref(), Some("https://v/done.mp4"));
    }

    #[tokio::test]
    async fn test_poll_survives_response_without_task_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/tasks/t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "request_id": "r" })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/tasks/t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output": { "task_status": "SUCCEEDED", "video_url": "https://x/y.mp4" }
            })))
            .mount(&server)
            .await;

        let poller = JobPoller::new(
            std::sync::Arc::new(client(&server).await),
            PollConfig::new(Duration::from_millis(5), 10),
        );
        let outcome = poller.spawn(JobId::from_string("t1")).outcome().await;
        assert_eq!(
            outcome,
            PollOutcome::Succeeded {
                result_url: "https://x/y.mp4".into(),
                attempts: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_server_error_is_transient_for_poller() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/tasks/t"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .check_status(&JobId::from_string("t"))
            .await
            .unwrap_err();
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_enroll_voice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/services/audio/voice-cloning/enroll"))
            .and(body_partial_json(json!({ "input": { "prefix": "u3f2a9b7c" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output": { "voice_id": "cosyvoice-v3-plus-u3f2a9b7c-abc" }
            })))
            .mount(&server)
            .await;

        let voice = client(&server)
            .await
            .enroll_voice("u3f2a9b7c", "https://a/sample.mp3")
            .await
            .unwrap();
        assert_eq!(voice, "cosyvoice-v3-plus-u3f2a9b7c-abc");
    }
}
