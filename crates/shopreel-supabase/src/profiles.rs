//! Repository for the `profiles` table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use shopreel_models::{MembershipLevel, UserProfile};

use crate::client::SupabaseClient;
use crate::error::{SupabaseError, SupabaseResult};
use crate::query::Query;

const TABLE: &str = "profiles";

#[derive(Serialize)]
struct NewProfile<'a> {
    id: &'a str,
    phone: &'a str,
    membership_level: MembershipLevel,
    max_daily_usage: u32,
    daily_usage_count: u32,
}

/// Membership and quota state per user.
#[derive(Clone)]
pub struct ProfileRepository {
    client: SupabaseClient,
}

impl ProfileRepository {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, user_id: &str) -> SupabaseResult<Option<UserProfile>> {
        self.client
            .select_one(TABLE, &Query::new().eq("id", user_id))
            .await
    }

    /// Create a free-tier profile and return the stored row.
    pub async fn create_free(&self, user_id: &str, phone: Option<&str>) -> SupabaseResult<UserProfile> {
        let template = UserProfile::new_free(user_id);
        let row = NewProfile {
            id: user_id,
            phone: phone.unwrap_or_default(),
            membership_level: template.membership_level,
            max_daily_usage: template.max_daily_usage,
            daily_usage_count: 0,
        };
        let created: Vec<UserProfile> = self.client.insert(TABLE, &row).await?;
        info!(user_id, "Created profile");
        created
            .into_iter()
            .next()
            .ok_or_else(|| SupabaseError::invalid_response("profile insert returned no row"))
    }

    /// Existing profile, or a freshly created free one.
    pub async fn get_or_create(&self, user_id: &str, phone: Option<&str>) -> SupabaseResult<UserProfile> {
        match self.get(user_id).await? {
            Some(profile) => Ok(profile),
            None => self.create_free(user_id, phone).await,
        }
    }

    /// Store today's usage count.
    pub async fn set_daily_usage(&self, user_id: &str, count: u32, now: DateTime<Utc>) -> SupabaseResult<()> {
        let _: Vec<UserProfile> = self
            .client
            .update(
                TABLE,
                &Query::new().eq("id", user_id),
                &json!({ "daily_usage_count": count, "updated_at": now }),
            )
            .await?;
        Ok(())
    }

    /// Persist the membership fields of `profile`.
    pub async fn save_membership(&self, profile: &UserProfile) -> SupabaseResult<()> {
        let updated: Vec<UserProfile> = self
            .client
            .update(
                TABLE,
                &Query::new().eq("id", &profile.id),
                &json!({
                    "membership_level": profile.membership_level,
                    "membership_expire_at": profile.membership_expire_at,
                    "updated_at": profile.updated_at,
                }),
            )
            .await?;
        if updated.is_empty() {
            return Err(SupabaseError::not_found(format!("profile {}", profile.id)));
        }
        info!(
            user_id = %profile.id,
            level = %profile.membership_level,
            "Membership updated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SupabaseConfig;
    use crate::retry::RetryConfig;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo(server: &MockServer) -> ProfileRepository {
        let mut config = SupabaseConfig::new(server.uri(), "k");
        config.retry = RetryConfig::none();
        ProfileRepository::new(SupabaseClient::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_get_or_create_inserts_missing_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/profiles"))
            .and(body_partial_json(json!({
                "id": "u1",
                "phone": "13800000000",
                "membership_level": "free",
                "max_daily_usage": 3
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": "u1",
                "phone": "13800000000",
                "membership_level": "free",
                "daily_usage_count": 0,
                "max_daily_usage": 3
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let profile = repo(&server).get_or_create("u1", Some("13800000000")).await.unwrap();
        assert_eq!(profile.membership_level, MembershipLevel::Free);
        assert_eq!(profile.max_daily_usage, 3);
    }

    #[tokio::test]
    async fn test_save_membership_missing_row() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("id", "eq.ghost"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let mut profile = UserProfile::new_free("ghost");
        profile.extend_membership(30, Utc::now());
        let err = repo(&server).save_membership(&profile).await.unwrap_err();
        assert!(matches!(err, SupabaseError::NotFound(_)));
    }
}
