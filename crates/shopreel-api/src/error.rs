//! API error types.
//!
//! Every error renders as a JSON object with at least an `error` field.
//! Paid-feature and quota refusals also carry `shouldShowUpgradeDialog` so
//! the client can open the membership dialog.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use shopreel_models::RequestError;
use shopreel_providers::ProviderError;
use shopreel_storage::StorageError;
use shopreel_supabase::SupabaseError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    /// Quota exhausted or a members-only feature; the client shows the upgrade dialog.
    #[error("{error}")]
    UpgradeRequired {
        error: String,
        message: String,
        limit: Option<u32>,
        used: Option<u32>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    /// An upstream failure whose status is passed through to the client.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// Model output that could not be used.
    #[error("{error}: {details}")]
    Generation { error: String, details: String },

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    Request(#[from] RequestError),

    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("{0}")]
    Supabase(#[from] SupabaseError),

    #[error("{0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn upgrade(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpgradeRequired {
            error: error.into(),
            message: message.into(),
            limit: None,
            used: None,
        }
    }

    pub fn quota(error: impl Into<String>, message: impl Into<String>, limit: u32, used: u32) -> Self {
        Self::UpgradeRequired {
            error: error.into(),
            message: message.into(),
            limit: Some(limit),
            used: Some(used),
        }
    }

    pub fn generation(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Generation {
            error: error.into(),
            details: details.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Request(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) | ApiError::UpgradeRequired { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Provider(ProviderError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Supabase(SupabaseError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Storage(StorageError::InvalidKey(_)) => StatusCode::BAD_REQUEST,
            ApiError::Generation { .. }
            | ApiError::Internal(_)
            | ApiError::Provider(_)
            | ApiError::Supabase(_)
            | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Datastore and storage internals are not shown to clients in production.
    fn is_internal_detail(&self) -> bool {
        match self {
            ApiError::Storage(StorageError::InvalidKey(_)) => false,
            ApiError::Supabase(_) | ApiError::Storage(_) => true,
            _ => false,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    should_show_upgrade_dialog: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    used: Option<u32>,
}

impl ErrorResponse {
    fn plain(error: String) -> Self {
        Self {
            error,
            message: None,
            details: None,
            should_show_upgrade_dialog: None,
            limit: None,
            used: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = match self {
            ApiError::UpgradeRequired {
                error,
                message,
                limit,
                used,
            } => ErrorResponse {
                error,
                message: Some(message),
                details: None,
                should_show_upgrade_dialog: Some(true),
                limit,
                used,
            },
            ApiError::Generation { error, details } => ErrorResponse {
                details: Some(details),
                ..ErrorResponse::plain(error)
            },
            ref other if other.is_internal_detail() && is_production() => {
                ErrorResponse::plain("服务器内部错误，请稍后重试".to_string())
            }
            other => ErrorResponse::plain(other.to_string()),
        };

        (status, Json(body)).into_response()
    }
}

fn is_production() -> bool {
    std::env::var("ENVIRONMENT")
        .map(|v| v.eq_ignore_ascii_case("production"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_quota_body_shape() {
        let (status, body) = render(ApiError::quota("今日生成次数已达上限", "升级", 3, 3)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "今日生成次数已达上限");
        assert_eq!(body["shouldShowUpgradeDialog"], true);
        assert_eq!(body["limit"], 3);
        assert_eq!(body["used"], 3);
    }

    #[tokio::test]
    async fn test_upgrade_without_counts() {
        let (_, body) = render(ApiError::upgrade("爆款仿写是 VIP 专属功能", "请升级")).await;
        assert!(body.get("limit").is_none());
        assert_eq!(body["message"], "请升级");
    }

    #[tokio::test]
    async fn test_upstream_status_passthrough() {
        let (status, body) = render(ApiError::Upstream {
            status: 422,
            message: "APIMart API Error: bad ratio".into(),
        })
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "APIMart API Error: bad ratio");
    }

    #[tokio::test]
    async fn test_generation_error_has_details() {
        let (status, body) = render(ApiError::generation("AI 返回格式错误", "无法解析")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["details"], "无法解析");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Request(RequestError::Missing("topic")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Provider(ProviderError::invalid_input("no link")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Provider(ProviderError::invalid_response("sora", "x")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }
}
