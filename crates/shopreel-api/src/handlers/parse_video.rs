//! Viral video parsing: share link → transcript → rewrite for the caller's shop.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use shopreel_models::{ParseVideoRequest, RequestError, RewriteRequest, TranscribeRequest};

use crate::auth::{requester_id, MaybeAuthUser};
use crate::error::{ApiError, ApiResult};
use crate::handlers::JsonBody;
use crate::metrics;
use crate::services::ScriptWriter;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeResponse {
    pub success: bool,
    pub extracted_text: String,
    pub video_url: String,
    pub mp4_url: String,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RewriteResponse {
    pub success: bool,
    pub content: String,
    pub message: &'static str,
}

/// `POST /api/parse-video`, dispatched on `action`.
pub async fn parse_video(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    headers: HeaderMap,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Response> {
    let request = ParseVideoRequest::from_value(body).map_err(|e| match e {
        RequestError::Missing(field) => ApiError::bad_request(format!("缺少必要参数: {field}")),
        other => ApiError::Request(other),
    })?;

    match request {
        ParseVideoRequest::ExtractAndTranscribe(req) => {
            Ok(Json(transcribe(&state, req).await?).into_response())
        }
        ParseVideoRequest::GenerateRewrite(req) => {
            let requester = requester_id(user.as_ref(), &headers)
                .ok_or_else(|| ApiError::unauthorized("请先登录"))?;
            Ok(Json(rewrite(&state, &requester, req).await?).into_response())
        }
    }
}

async fn transcribe(state: &AppState, request: TranscribeRequest) -> ApiResult<TranscribeResponse> {
    let mp4_url = state.apihz()?.resolve_video_url(&request.video_url).await?;
    let extracted_text = state.siliconflow()?.transcribe_url(&mp4_url).await?;
    info!(chars = extracted_text.chars().count(), "Video transcribed");

    Ok(TranscribeResponse {
        success: true,
        extracted_text,
        video_url: request.video_url,
        mp4_url,
        message: "视频转录成功",
    })
}

async fn rewrite(
    state: &AppState,
    requester: &str,
    request: RewriteRequest,
) -> ApiResult<RewriteResponse> {
    let profile = state
        .profiles
        .get(requester)
        .await?
        .ok_or_else(|| ApiError::internal("获取用户信息失败"))?;
    if !profile.is_member_active(Utc::now()) {
        return Err(ApiError::upgrade(
            "爆款仿写是 VIP 专属功能",
            "请升级为 VIP 会员获得此功能",
        ));
    }

    let writer = ScriptWriter::new(state.llm()?.clone());
    let result = writer
        .rewrite(&request.extracted_text, &request.shop_profile)
        .await;
    metrics::record_generation("rewrite", if result.is_ok() { "ok" } else { "error" });

    Ok(RewriteResponse {
        success: true,
        content: result?,
        message: "仿写内容生成成功",
    })
}
