//! Script generation: one-shot storyboards and the two-step hook flow.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use futures_util::TryStreamExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use shopreel_models::{GenerateRequest, RequestError};

use crate::auth::MaybeAuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::JsonBody;
use crate::metrics;
use crate::middleware::reported_generation_count;
use crate::services::ScriptWriter;
use crate::state::AppState;

/// Markdown script reply for the non-streaming second step.
#[derive(Serialize)]
pub struct ScriptContentResponse {
    pub content: String,
}

/// `POST /api/generate`.
///
/// Bodies without `step` produce a JSON storyboard and count against the
/// caller's quota. `step: "ideas"` returns hook suggestions and
/// `step: "script"` a Markdown script, optionally streamed as plain text.
pub async fn generate(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    headers: HeaderMap,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Response> {
    let request = GenerateRequest::from_value(body).map_err(|e| match e {
        RequestError::Missing(field) => ApiError::bad_request(format!("缺少必要参数: {field}")),
        other => ApiError::Request(other),
    })?;
    let step = request.step_name();
    let writer = ScriptWriter::new(state.llm()?.clone());

    let result = match request {
        GenerateRequest::Direct(req) => {
            let grant = state
                .quota
                .check(
                    user.as_ref(),
                    req.device_id.as_deref(),
                    reported_generation_count(&headers),
                    Utc::now(),
                )
                .await?;

            let script = writer.direct(&req).await;
            if script.is_ok() {
                // A failed counter write does not take the script away from the caller.
                if let Err(e) = state.quota.commit(&grant, Utc::now()).await {
                    warn!(error = %e, "Failed to record generation usage");
                }
            }
            script.map(|s| Json(s).into_response())
        }
        GenerateRequest::Ideas(req) => writer.ideas(&req).await.map(|r| Json(r).into_response()),
        GenerateRequest::Script(req) if req.stream => writer
            .hook_script_stream(&req)
            .await
            .map(streaming_text_response),
        GenerateRequest::Script(req) => writer
            .hook_script(&req)
            .await
            .map(|content| Json(ScriptContentResponse { content }).into_response()),
    };

    let outcome = if result.is_ok() { "ok" } else { "error" };
    metrics::record_generation(step, outcome);
    info!(step, outcome, user_id = user.as_ref().map(|u| u.id.as_str()), "Generation finished");
    result
}

fn streaming_text_response(stream: shopreel_providers::TextStream) -> Response {
    let stream = stream.inspect_err(|e| warn!(error = %e, "Script stream aborted"));
    let mut response = Body::from_stream(stream).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert("X-Accel-Buffering", HeaderValue::from_static("no"));
    response
}
