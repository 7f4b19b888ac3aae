//! Video generation: digital-human lip-sync and Sora image-to-video.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use validator::Validate;

use shopreel_models::{DigitalVideoRequest, JobProvider, SoraGenerateRequest, SoraModel};
use shopreel_providers::{preprocess_tts_text, resolve_voice_id, ProviderError, SoraSubmission};
use shopreel_storage::generated_audio_key;

use crate::error::{ApiError, ApiResult};
use crate::handlers::JsonBody;
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub task_id: Option<String>,
}

impl TaskQuery {
    fn require(self, message: &str) -> ApiResult<String> {
        self.task_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request(message))
    }
}

/// Surface an upstream rejection with its own status, prefixed for the client.
fn upstream(prefix: &str, e: ProviderError) -> ApiError {
    match (e.http_status(), e.upstream_body()) {
        (Some(status), Some(body)) => ApiError::Upstream {
            status,
            message: format!("{prefix}: {body}"),
        },
        _ => ApiError::Provider(e),
    }
}

/// `GET /api/check-task?taskId=`: raw DashScope task document.
pub async fn check_task(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<Value>> {
    let task_id = query.require("Missing taskId")?;
    let task = state.dashscope()?.task(&task_id).await?;
    Ok(Json(task))
}

/// `GET /api/sora-generate?taskId=`: raw APIMart task document.
pub async fn sora_status(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<Value>> {
    let task_id = query.require("Missing taskId parameter")?;
    let task = state
        .apimart()?
        .task(&task_id)
        .await
        .map_err(|e| upstream("Query Error", e))?;
    Ok(Json(task))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoraGenerateResponse {
    pub success: bool,
    pub task_id: String,
    pub rewritten_prompt: String,
    pub original_prompt: String,
}

/// `POST /api/sora-generate`: rewrite the prompt, then submit the job.
pub async fn sora_generate(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Json<SoraGenerateResponse>> {
    let request: SoraGenerateRequest = serde_json::from_value(body).map_err(|_| {
        ApiError::bad_request("Missing required parameters: imageUrl, prompt, type, ratio")
    })?;
    request
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let client = state.apimart()?;

    let rewritten = state
        .providers
        .director
        .rewrite(&request.prompt, request.shot_type)
        .await;

    let submission = SoraSubmission {
        model: SoraModel::from_request(request.model.as_deref()),
        prompt: rewritten.clone(),
        image_urls: vec![request.image_url.clone()],
        duration: request.duration_secs(),
        aspect_ratio: request.ratio,
    };
    let task_id = client
        .submit(&submission)
        .await
        .map_err(|e| upstream("APIMart API Error", e))?;

    metrics::record_job_submitted(JobProvider::Sora.as_str());
    info!(
        task_id = %task_id,
        model = submission.model.as_str(),
        ratio = submission.aspect_ratio.as_str(),
        "Sora generation started"
    );

    Ok(Json(SoraGenerateResponse {
        success: true,
        task_id: task_id.to_string(),
        rewritten_prompt: rewritten,
        original_prompt: request.prompt,
    }))
}

#[derive(Debug, Serialize)]
pub struct DigitalVideoResponse {
    pub success: bool,
    pub task_id: String,
    pub audio_url: String,
}

/// `POST /api/generate-digital-video`.
///
/// Speech is synthesized from the script, uploaded so the lip-sync service
/// can fetch it, and a VideoRetalk job is submitted against the base video.
pub async fn generate_digital_video(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Json<DigitalVideoResponse>> {
    let request: DigitalVideoRequest = serde_json::from_value(body).map_err(|_| {
        ApiError::bad_request("Missing parameters: text, voice_id, video_url required")
    })?;
    request
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let dashscope = state.dashscope()?;
    let storage = state.storage()?;

    let voice = resolve_voice_id(&request.voice_id);
    let text = preprocess_tts_text(&request.text);
    let audio = dashscope
        .synthesize_speech(&text, voice, request.model.as_deref())
        .await?;

    let key = generated_audio_key(Utc::now());
    let audio_url = storage.upload_bytes(audio, &key, "audio/mpeg").await?;

    let task_id = dashscope.submit_retalk(&request.video_url, &audio_url).await?;
    metrics::record_job_submitted(JobProvider::DashScope.as_str());
    info!(task_id = %task_id, voice, "Digital-human generation started");

    Ok(Json(DigitalVideoResponse {
        success: true,
        task_id: task_id.to_string(),
        audio_url,
    }))
}
