//! APIMart client for Sora video generation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use shopreel_models::{AspectRatio, JobId, JobState, SoraModel, StatusReport};
use shopreel_poller::{JobStatusSource, PollError};
use tracing::info;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{build_client, env_opt, env_secs, json_body, send};

const PROVIDER: &str = "sora";

/// APIMart configuration.
#[derive(Debug, Clone)]
pub struct ApiMartConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl ApiMartConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.apimart.ai".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_env() -> ProviderResult<Self> {
        let api_key = env_opt("APIMART_API_KEY")
            .ok_or_else(|| ProviderError::not_configured(PROVIDER, "APIMART_API_KEY not set"))?;
        let mut config = Self::new(api_key);
        if let Some(base_url) = env_opt("APIMART_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        config.timeout = env_secs("APIMART_TIMEOUT_SECS", 60);
        Ok(config)
    }
}

/// A video generation submission.
#[derive(Debug, Clone, Serialize)]
pub struct SoraSubmission {
    pub model: SoraModel,
    pub prompt: String,
    pub image_urls: Vec<String>,
    pub duration: u32,
    pub aspect_ratio: AspectRatio,
}

/// APIMart REST client.
#[derive(Clone)]
pub struct ApiMartClient {
    http: Client,
    config: ApiMartConfig,
}

impl ApiMartClient {
    pub fn new(config: ApiMartConfig) -> ProviderResult<Self> {
        Ok(Self {
            http: build_client(config.timeout)?,
            config,
        })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(ApiMartConfig::from_env()?)
    }

    /// Submit a generation job and return its task id.
    pub async fn submit(&self, submission: &SoraSubmission) -> ProviderResult<JobId> {
        let request = self
            .http
            .post(format!("{}/v1/videos/generations", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(submission);
        let response = send(PROVIDER, "submit", request).await?;
        let value = json_body(PROVIDER, response).await?;

        let task_id = extract_task_id(&value)
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, format!("no task id in {value}")))?;
        info!(task_id = %task_id, model = submission.model.as_str(), "Sora job submitted");
        Ok(JobId::from_string(task_id))
    }

    /// Raw task document, as APIMart returns it.
    pub async fn task(&self, task_id: &str) -> ProviderResult<Value> {
        let encoded: String = url::form_urlencoded::byte_serialize(task_id.as_bytes()).collect();
        let request = self
            .http
            .get(format!("{}/v1/tasks/{encoded}", self.config.base_url))
            .bearer_auth(&self.config.api_key);
        let response = send(PROVIDER, "task_status", request).await?;
        json_body(PROVIDER, response).await
    }
}

#[async_trait]
impl JobStatusSource for ApiMartClient {
    async fn check_status(&self, job_id: &JobId) -> Result<StatusReport, PollError> {
        let value = self.task(job_id.as_str()).await?;
        Ok(parse_task_status(&value))
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

/// Find the task id across the response shapes APIMart has been seen to use.
pub fn extract_task_id(value: &Value) -> Option<String> {
    ["/data/0/task_id", "/data/task_id", "/task_id", "/data/0/id", "/id"]
        .iter()
        .filter_map(|pointer| value.pointer(pointer))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// Map an APIMart task document onto a [`StatusReport`].
pub fn parse_task_status(value: &Value) -> StatusReport {
    let status = value
        .pointer("/data/status")
        .or_else(|| value.get("status"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_ascii_lowercase();

    match status.as_str() {
        "completed" => match result_url(value) {
            Some(url) => StatusReport::succeeded(url),
            None => StatusReport {
                state: JobState::Succeeded,
                result_url: None,
                error_message: None,
            },
        },
        "failed" => StatusReport::failed(error_message(value).unwrap_or_else(|| "generation failed".into())),
        "pending" | "queued" | "submitted" => StatusReport::pending(),
        _ => StatusReport::running(),
    }
}

fn result_url(value: &Value) -> Option<String> {
    ["/data/result/videos/0/url", "/result/videos/0/url"]
        .iter()
        .filter_map(|pointer| value.pointer(pointer))
        .find_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .filter(|s| !s.is_empty())
}

fn error_message(value: &Value) -> Option<String> {
    ["/error", "/message", "/data/error"]
        .iter()
        .filter_map(|pointer| value.pointer(pointer))
        .find_map(|v| match v {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_extract_task_id_shapes() {
        assert_eq!(extract_task_id(&json!({ "data": [{ "task_id": "a" }] })).as_deref(), Some("a"));
        assert_eq!(extract_task_id(&json!({ "data": { "task_id": "b" } })).as_deref(), Some("b"));
        assert_eq!(extract_task_id(&json!({ "task_id": "c" })).as_deref(), Some("c"));
        assert_eq!(extract_task_id(&json!({ "data": [{ "id": "d" }] })).as_deref(), Some("d"));
        assert_eq!(extract_task_id(&json!({ "id": 17 })).as_deref(), Some("17"));
        assert_eq!(extract_task_id(&json!({ "data": [] })), None);
    }

    #[test]
    fn test_status_mapping() {
        let doc = |s: &str| json!({ "data": { "status": s } });
        assert_eq!(parse_task_status(&doc("pending")).state, JobState::Pending);
        assert_eq!(parse_task_status(&doc("queued")).state, JobState::Pending);
        assert_eq!(parse_task_status(&doc("submitted")).state, JobState::Pending);
        assert_eq!(parse_task_status(&doc("processing")).state, JobState::Running);
        assert_eq!(parse_task_status(&doc("in_progress")).state, JobState::Running);
        assert_eq!(parse_task_status(&json!({ "status": "failed" })).state, JobState::Failed);
    }

    #[test]
    fn test_completed_result_url_shapes() {
        let array = json!({ "data": { "status": "completed", "result": { "videos": [{ "url": ["https://v/a.mp4"] }] } } });
        assert_eq!(parse_task_status(&array).result_url.as_deref(), Some("https://v/a.mp4"));

        let plain = json!({ "status": "completed", "result": { "videos": [{ "url": "https://v/b.mp4" }] } });
        assert_eq!(parse_task_status(&plain).result_url.as_deref(), Some("https://v/b.mp4"));
    }

    #[test]
    fn test_failure_message_is_stringified() {
        let doc = json!({ "data": { "status": "failed", "error": { "code": "content_policy" } } });
        let report = parse_task_status(&doc);
        assert_eq!(report.state, JobState::Failed);
        assert!(report.error_message.unwrap().contains("content_policy"));
    }

    #[tokio::test]
    async fn test_submit_extracts_task_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/videos/generations"))
            .and(body_partial_json(json!({
                "model": "sora-2",
                "aspect_ratio": "9:16",
                "duration": 15,
                "image_urls": ["https://img/shop.jpg"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": [{ "status": "submitted", "task_id": "task_01J" }]
            })))
            .mount(&server)
            .await;

        let client = ApiMartClient::new(ApiMartConfig::new("k").with_base_url(server.uri())).unwrap();
        let id = client
            .submit(&SoraSubmission {
                model: SoraModel::Sora2,
                prompt: "first-person walk into a noodle shop".into(),
                image_urls: vec!["https://img/shop.jpg".into()],
                duration: 15,
                aspect_ratio: AspectRatio::Portrait,
            })
            .await
            .unwrap();
        assert_eq!(id.as_str(), "task_01J");
    }

    #[tokio::test]
    async fn test_submit_without_task_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/videos/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        let client = ApiMartClient::new(ApiMartConfig::new("k").with_base_url(server.uri())).unwrap();
        let err = client
            .submit(&SoraSubmission {
                model: SoraModel::Sora2Pro,
                prompt: "p".into(),
                image_urls: vec![],
                duration: 10,
                aspect_ratio: AspectRatio::Landscape,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_task_keeps_upstream_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/tasks/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("task not found"))
            .mount(&server)
            .await;

        let client = ApiMartClient::new(ApiMartConfig::new("k").with_base_url(server.uri())).unwrap();
        let err = client.task("missing").await.unwrap_err();
        assert_eq!(err.http_status(), Some(404));
        assert!(PollError::from(err).is_fatal());
    }
}
