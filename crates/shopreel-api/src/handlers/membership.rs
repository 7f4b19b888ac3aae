//! Membership: redeem codes and the caller's quota summary.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};
use validator::Validate;

use shopreel_models::{MembershipLevel, RedeemCode, RedeemRequest, DAILY_LIMIT_FREE};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::JsonBody;
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemResponse {
    pub success: bool,
    pub message: String,
    pub expiry: DateTime<Utc>,
    pub membership_level: MembershipLevel,
}

/// `POST /api/redeem`.
///
/// The code is claimed with a conditional update before the membership is
/// extended, so two concurrent redeems cannot both succeed. If the profile
/// write fails the claim is released.
pub async fn redeem(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Json<RedeemResponse>> {
    let code = serde_json::from_value::<RedeemRequest>(body)
        .ok()
        .filter(|r| r.validate().is_ok())
        .map(|r| RedeemCode::normalize(&r.code))
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("请输入有效的卡密"))?;

    let Some(record) = state.redeem_codes.find(&code).await? else {
        metrics::record_redeem("unknown");
        return Err(ApiError::not_found("卡密不存在或已过期"));
    };
    if record.is_used {
        metrics::record_redeem("used");
        return Err(ApiError::bad_request("该卡密已被使用"));
    }

    let now = Utc::now();
    if !state.redeem_codes.claim(&code, &user.id, now).await? {
        metrics::record_redeem("used");
        return Err(ApiError::bad_request("该卡密已被使用"));
    }

    let expiry = match extend(&state, &user, record.validity_days(), now).await {
        Ok(expiry) => expiry,
        Err(e) => {
            error!(user_id = %user.id, code = %code, error = %e, "Membership update failed");
            if let Err(release) = state.redeem_codes.release(&code, &user.id).await {
                warn!(code = %code, error = %release, "Failed to release redeem code");
            }
            metrics::record_redeem("error");
            return Err(ApiError::internal("更新会员信息失败"));
        }
    };

    metrics::record_redeem("ok");
    info!(user_id = %user.id, days = record.validity_days(), expiry = %expiry, "Code redeemed");

    Ok(Json(RedeemResponse {
        success: true,
        message: format!(
            "恭喜！您已成功兑换会员，有效期至 {}",
            expiry.format("%Y-%m-%d")
        ),
        expiry,
        membership_level: MembershipLevel::Premium,
    }))
}

async fn extend(
    state: &AppState,
    user: &AuthUser,
    days: i64,
    now: DateTime<Utc>,
) -> ApiResult<DateTime<Utc>> {
    let mut profile = state
        .profiles
        .get_or_create(&user.id, user.phone.as_deref())
        .await?;
    let expiry = profile.extend_membership(days, now);
    state.profiles.save_membership(&profile).await?;
    Ok(expiry)
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub membership_level: MembershipLevel,
    pub membership_expire_at: Option<DateTime<Utc>>,
    pub is_member: bool,
    pub usage_today: u32,
    /// `None` for active members.
    pub daily_limit: Option<u32>,
}

/// `GET /api/profile`.
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = state
        .profiles
        .get_or_create(&user.id, user.phone.as_deref())
        .await?;
    let now = Utc::now();
    let is_member = profile.is_member_active(now);

    Ok(Json(ProfileResponse {
        usage_today: profile.usage_today(now),
        daily_limit: (!is_member).then_some(DAILY_LIMIT_FREE),
        is_member,
        membership_level: profile.membership_level,
        membership_expire_at: profile.membership_expire_at,
        id: profile.id,
    }))
}
