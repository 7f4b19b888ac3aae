//! Digital assets (cloned voice, base video) and media uploads.

use axum::extract::{Multipart, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use validator::Validate;

use shopreel_models::{voice_prefix, AssetKind, AssetUpdateRequest, AssetWritePlan, UserDigitalAssets};
use shopreel_storage::{content_type_for, upload_key};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::JsonBody;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetsQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssetsResponse {
    pub assets: Option<UserDigitalAssets>,
}

/// `GET /api/digital-assets?userId=`.
pub async fn get_digital_assets(
    State(state): State<AppState>,
    Query(query): Query<AssetsQuery>,
) -> ApiResult<Json<AssetsResponse>> {
    let user_id = query
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing userId"))?;
    let assets = state.assets.latest(&user_id).await?;
    Ok(Json(AssetsResponse { assets }))
}

#[derive(Debug, Serialize)]
pub struct AssetUpdateResponse {
    pub success: bool,
    pub voice_id: Option<String>,
    pub video_url: Option<String>,
}

/// `POST /api/digital-assets`.
///
/// A video URL is stored as the user's base video. An audio URL is a voice
/// sample: it is enrolled first and the resulting voice id is stored.
pub async fn update_digital_assets(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Json<AssetUpdateResponse>> {
    let request: AssetUpdateRequest =
        serde_json::from_value(body).map_err(|_| ApiError::bad_request("Missing required fields"))?;
    request
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let value = match request.kind {
        AssetKind::Video => request.url.clone(),
        AssetKind::Audio => {
            let prefix = voice_prefix(&request.user_id);
            let voice_id = state.dashscope()?.enroll_voice(&prefix, &request.url).await?;
            info!(user_id = %request.user_id, voice_id = %voice_id, "Voice cloned");
            voice_id
        }
    };

    let existing = state.assets.all_for_user(&request.user_id).await?;
    let plan = AssetWritePlan::new(&existing, &request.user_id, request.kind, value, Utc::now());
    let saved = state.assets.apply(&plan).await?;

    Ok(Json(AssetUpdateResponse {
        success: true,
        voice_id: saved.voice_id,
        video_url: saved.default_video_url,
    }))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub key: String,
    pub kind: &'static str,
}

/// `POST /api/uploads`: multipart `file` field, stored publicly on OSS.
pub async fn upload_media(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let storage = state.storage()?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
        if data.is_empty() {
            return Err(ApiError::bad_request("Uploaded file is empty"));
        }

        let (key, kind) = upload_key(&user.id, &filename)?;
        let url = storage
            .upload_bytes(data.to_vec(), &key, content_type_for(&key))
            .await?;
        info!(user_id = %user.id, key = %key, bytes = data.len(), "Media uploaded");

        return Ok(Json(UploadResponse {
            success: true,
            url,
            key,
            kind: kind.as_str(),
        }));
    }

    Err(ApiError::bad_request("Missing file"))
}
