//! Supabase access-token authentication.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Audience Supabase puts on tokens of signed-in users.
const SUPABASE_AUDIENCE: &str = "authenticated";

/// Header carrying a phone number for lead-capture users without a session.
const LEAD_PHONE_HEADER: &str = "x-user-phone";

/// Decoded Supabase access-token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseClaims {
    /// User ID
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Authenticated user extracted from request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<SupabaseClaims> for AuthUser {
    fn from(claims: SupabaseClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email.filter(|s| !s.is_empty()),
            phone: claims.phone.filter(|s| !s.is_empty()),
        }
    }
}

/// Verifies HS256 tokens signed with the project's JWT secret.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[SUPABASE_AUDIENCE]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Read `SUPABASE_JWT_SECRET`.
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("SUPABASE_JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("SUPABASE_JWT_SECRET must be set"))?;
        Ok(Self::new(&secret))
    }

    pub fn verify(&self, token: &str) -> ApiResult<SupabaseClaims> {
        decode::<SupabaseClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| ApiError::unauthorized(format!("Token validation failed: {e}")))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Axum extractor for authenticated user.
#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| ApiError::unauthorized("请先登录"))?;
        let claims = state.auth.verify(token)?;
        Ok(AuthUser::from(claims))
    }
}

/// A session if the request carries a valid one.
///
/// A missing or invalid token is treated as anonymous.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(MaybeAuthUser(None));
        };
        match state.auth.verify(token) {
            Ok(claims) => Ok(MaybeAuthUser(Some(claims.into()))),
            Err(e) => {
                debug!(error = %e, "Ignoring invalid session token");
                Ok(MaybeAuthUser(None))
            }
        }
    }
}

/// Profile id for the caller: the session user, else a lead identified by phone.
pub fn requester_id(user: Option<&AuthUser>, headers: &HeaderMap) -> Option<String> {
    if let Some(user) = user {
        return Some(user.id.clone());
    }
    headers
        .get(LEAD_PHONE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|phone| format!("lead_{phone}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub(crate) const TEST_SECRET: &str = "test-jwt-secret-with-enough-entropy";

    pub(crate) fn mint(sub: &str, aud: &str, exp_offset_secs: i64) -> String {
        let claims = SupabaseClaims {
            sub: sub.to_string(),
            aud: aud.to_string(),
            exp: Utc::now().timestamp() + exp_offset_secs,
            email: None,
            phone: Some("13800000000".into()),
            role: Some("authenticated".into()),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_valid_token() {
        let verifier = JwtVerifier::new(TEST_SECRET);
        let claims = verifier.verify(&mint("user-1", "authenticated", 600)).unwrap();
        let user = AuthUser::from(claims);
        assert_eq!(user.id, "user-1");
        assert_eq!(user.phone.as_deref(), Some("13800000000"));
    }

    #[test]
    fn test_reject_expired_and_wrong_audience() {
        let verifier = JwtVerifier::new(TEST_SECRET);
        assert!(verifier.verify(&mint("user-1", "authenticated", -3600)).is_err());
        assert!(verifier.verify(&mint("user-1", "anon", 600)).is_err());
        assert!(JwtVerifier::new("other-secret")
            .verify(&mint("user-1", "authenticated", 600))
            .is_err());
    }

    #[test]
    fn test_requester_id_falls_back_to_phone() {
        let mut headers = HeaderMap::new();
        assert_eq!(requester_id(None, &headers), None);

        headers.insert(LEAD_PHONE_HEADER, HeaderValue::from_static("13900000000"));
        assert_eq!(
            requester_id(None, &headers).as_deref(),
            Some("lead_13900000000")
        );

        let user = AuthUser {
            id: "u-1".into(),
            email: None,
            phone: None,
        };
        assert_eq!(requester_id(Some(&user), &headers).as_deref(), Some("u-1"));
    }
}
