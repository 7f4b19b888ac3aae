//! Generation quota for members, free users and anonymous devices.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use shopreel_models::{QuotaDecision, DEVICE_FREE_LIMIT};
use shopreel_supabase::{LicenseKeyRepository, ProfileRepository};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};

/// Permission to run one generation, consumed with [`QuotaService::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaGrant {
    pub decision: QuotaDecision,
    /// Profile whose daily counter is bumped on commit.
    user_id: Option<String>,
}

impl QuotaGrant {
    fn untracked() -> Self {
        Self {
            decision: QuotaDecision::Unlimited,
            user_id: None,
        }
    }
}

#[derive(Clone)]
pub struct QuotaService {
    profiles: ProfileRepository,
    licenses: LicenseKeyRepository,
}

impl QuotaService {
    pub fn new(profiles: ProfileRepository, licenses: LicenseKeyRepository) -> Self {
        Self { profiles, licenses }
    }

    /// Decide whether the caller may generate once more.
    ///
    /// Signed-in users are limited per day unless their membership is active.
    /// Anonymous callers with a device id are unlimited with a valid license,
    /// otherwise limited by the count their client reports. Callers with
    /// neither are not tracked.
    pub async fn check(
        &self,
        user: Option<&AuthUser>,
        device_id: Option<&str>,
        reported_count: u32,
        now: DateTime<Utc>,
    ) -> ApiResult<QuotaGrant> {
        if let Some(user) = user {
            let profile = self
                .profiles
                .get_or_create(&user.id, user.phone.as_deref())
                .await?;
            let decision = profile.check_quota(now);
            if let QuotaDecision::Exceeded { used, limit } = decision {
                info!(user_id = %user.id, used, limit, "Daily quota exhausted");
                return Err(ApiError::quota(
                    "今日生成次数已达上限",
                    "您的免费额度已用尽，请升级为 VIP 会员获得无限生成权限",
                    limit,
                    used,
                ));
            }
            return Ok(QuotaGrant {
                decision,
                user_id: Some(user.id.clone()),
            });
        }

        let Some(device_id) = device_id.filter(|d| !d.trim().is_empty()) else {
            debug!("Anonymous request without device id; quota not tracked");
            return Ok(QuotaGrant::untracked());
        };

        let licenses = self.licenses.for_device(device_id).await?;
        let decision = QuotaDecision::for_device(&licenses, reported_count, now);
        if let QuotaDecision::Exceeded { used, limit } = decision {
            info!(device_id, used, limit, "Device trial exhausted");
            return Err(ApiError::quota(
                "您的免费试用次数已用尽",
                format!("免费试用仅限 {DEVICE_FREE_LIMIT} 次生成。输入卡密可获得无限生成权限！"),
                limit,
                used,
            ));
        }
        // Device usage is counted client-side.
        Ok(QuotaGrant {
            decision,
            user_id: None,
        })
    }

    /// Record one successful generation against the grant.
    pub async fn commit(&self, grant: &QuotaGrant, now: DateTime<Utc>) -> ApiResult<()> {
        let (Some(user_id), QuotaDecision::Allowed { used, .. }) = (&grant.user_id, grant.decision) else {
            return Ok(());
        };
        self.profiles.set_daily_usage(user_id, used + 1, now).await?;
        debug!(user_id, count = used + 1, "Daily usage recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use shopreel_supabase::{RetryConfig, SupabaseClient, SupabaseConfig};
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer) -> QuotaService {
        let mut config = SupabaseConfig::new(server.uri(), "k");
        config.retry = RetryConfig::none();
        let client = SupabaseClient::new(config).unwrap();
        QuotaService::new(
            ProfileRepository::new(client.clone()),
            LicenseKeyRepository::new(client),
        )
    }

    fn user(id: &str) -> AuthUser {
        AuthUser {
            id: id.into(),
            email: None,
            phone: None,
        }
    }

    #[tokio::test]
    async fn test_free_user_exhausted() {
        let server = MockServer::start().await;
        let now = Utc::now();
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "u1", "membership_level": "free",
                "daily_usage_count": 3, "updated_at": now
            }])))
            .mount(&server)
            .await;

        let err = service(&server)
            .check(Some(&user("u1")), None, 0, now)
            .await
            .unwrap_err();
        match err {
            ApiError::UpgradeRequired { limit, used, .. } => {
                assert_eq!(limit, Some(3));
                assert_eq!(used, Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_commit_bumps_counter() {
        let server = MockServer::start().await;
        let now = Utc::now();
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "u1", "daily_usage_count": 1, "updated_at": now
            }])))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("id", "eq.u1"))
            .and(body_partial_json(json!({ "daily_usage_count": 2 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "u1" }])))
            .expect(1)
            .mount(&server)
            .await;

        let quota = service(&server);
        let grant = quota.check(Some(&user("u1")), None, 0, now).await.unwrap();
        assert!(grant.decision.consumes_quota());
        quota.commit(&grant, now).await.unwrap();
    }

    #[tokio::test]
    async fn test_licensed_device_is_unlimited() {
        let server = MockServer::start().await;
        let now = Utc::now();
        Mock::given(method("GET"))
            .and(path("/rest/v1/license_keys"))
            .and(query_param("device_id", "eq.dev-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "device_id": "dev-1", "expires_at": now + Duration::days(3)
            }])))
            .mount(&server)
            .await;

        let grant = service(&server)
            .check(None, Some("dev-1"), 42, now)
            .await
            .unwrap();
        assert_eq!(grant.decision, QuotaDecision::Unlimited);
    }

    #[tokio::test]
    async fn test_device_trial_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/license_keys"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = service(&server)
            .check(None, Some("dev-2"), 5, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UpgradeRequired { used: Some(5), .. }));
    }

    #[tokio::test]
    async fn test_untracked_caller_makes_no_calls() {
        let server = MockServer::start().await;
        let quota = service(&server);
        let grant = quota.check(None, None, 99, Utc::now()).await.unwrap();
        quota.commit(&grant, Utc::now()).await.unwrap();
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
