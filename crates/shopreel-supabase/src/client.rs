//! Supabase PostgREST client.
//!
//! - Service-role authentication (row-level security is bypassed)
//! - HTTP client tuning (pooling, timeouts)
//! - Exponential backoff with jitter on transient failures
//! - Observability (tracing spans, metrics)

use std::time::{Duration, Instant};

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info_span, Instrument};

use crate::error::{SupabaseError, SupabaseResult};
use crate::metrics::record_request;
use crate::query::Query;
use crate::retry::{with_retry, RetryConfig};

/// Supabase client configuration.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Service-role key
    pub service_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> SupabaseResult<Self> {
        let url = std::env::var("SUPABASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SupabaseError::config_error("SUPABASE_URL must be set"))?;
        let service_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .or_else(|_| std::env::var("SUPABASE_SERVICE_KEY"))
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SupabaseError::config_error("SUPABASE_SERVICE_ROLE_KEY must be set"))?;

        let timeout_secs: u64 = std::env::var("SUPABASE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let connect_timeout_secs: u64 = std::env::var("SUPABASE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
            ..Self::new(url, service_key)
        })
    }
}

/// PostgREST client over the Supabase REST endpoint.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    config: SupabaseConfig,
    rest_url: String,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> SupabaseResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("shopreel-supabase/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SupabaseError::Network)?;

        let rest_url = format!("{}/rest/v1", config.url);
        Ok(Self {
            http,
            config,
            rest_url,
        })
    }

    pub fn from_env() -> SupabaseResult<Self> {
        Self::new(SupabaseConfig::from_env()?)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
    }

    /// Rows matching `query`.
    pub async fn select<T: DeserializeOwned>(&self, table: &str, query: &Query) -> SupabaseResult<Vec<T>> {
        let url = &self.table_url(table);
        let params = &query.to_params(true);

        self.execute_request("select", table, move || async move {
            let request = self.authorized(self.http.get(url)).query(params);
            rows(request.send().await?).await
        })
        .await
    }

    /// First row matching `query`, if any.
    pub async fn select_one<T: DeserializeOwned>(&self, table: &str, query: &Query) -> SupabaseResult<Option<T>> {
        let rows: Vec<T> = self.select(table, &query.clone().limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert one row or an array of rows and return what was stored.
    pub async fn insert<B, T>(&self, table: &str, body: &B) -> SupabaseResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = &self.table_url(table);
        let body = &serde_json::to_value(body)?;

        self.execute_request("insert", table, move || async move {
            let request = self
                .authorized(self.http.post(url))
                .header("Prefer", "return=representation")
                .json(body);
            rows(request.send().await?).await
        })
        .await
    }

    /// Patch rows matching `query` and return the updated rows.
    ///
    /// An empty result means no row matched, which callers use for
    /// conditional updates.
    pub async fn update<B, T>(&self, table: &str, query: &Query, body: &B) -> SupabaseResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if !query.has_filters() {
            return Err(SupabaseError::InvalidQuery(format!("unfiltered update on {table}")));
        }
        let url = &self.table_url(table);
        let params = &query.to_params(false);
        let body = &serde_json::to_value(body)?;

        self.execute_request("update", table, move || async move {
            let request = self
                .authorized(self.http.patch(url))
                .query(params)
                .header("Prefer", "return=representation")
                .json(body);
            rows(request.send().await?).await
        })
        .await
    }

    /// Delete rows matching `query`; returns the number removed.
    pub async fn delete(&self, table: &str, query: &Query) -> SupabaseResult<usize> {
        if !query.has_filters() {
            return Err(SupabaseError::InvalidQuery(format!("unfiltered delete on {table}")));
        }
        let url = &self.table_url(table);
        let params = &query.to_params(false);

        self.execute_request("delete", table, move || async move {
            let request = self
                .authorized(self.http.delete(url))
                .query(params)
                .header("Prefer", "return=representation");
            let deleted: Vec<serde_json::Value> = rows(request.send().await?).await?;
            Ok(deleted.len())
        })
        .await
    }

    /// Readiness probe against the REST root.
    pub async fn ping(&self) -> SupabaseResult<()> {
        let url = format!("{}/", self.rest_url);
        let response = self.authorized(self.http.get(&url)).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }

    /// Execute a request with retry, tracing and metrics.
    async fn execute_request<T, F, Fut>(&self, operation: &str, table: &str, op: F) -> SupabaseResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = SupabaseResult<T>>,
    {
        let span = info_span!("supabase_request", operation = %operation, table = %table);

        let start = Instant::now();
        let result = with_retry(&self.config.retry, operation, op)
            .instrument(span)
            .await;
        let elapsed = start.elapsed();

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(table, operation, status, elapsed);
        debug!(
            operation,
            table,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Supabase request finished"
        );

        result
    }
}

async fn rows<T: DeserializeOwned>(response: Response) -> SupabaseResult<Vec<T>> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&text).map_err(|e| SupabaseError::invalid_response(format!("{e}: {text}")))
}

async fn error_from_response(response: Response) -> SupabaseError {
    let status = response.status().as_u16();
    let retry_after_ms = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(|secs| secs * 1000);
    let body = response.text().await.unwrap_or_default();
    SupabaseError::from_http_status(status, body, retry_after_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use serial_test::serial;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SupabaseClient {
        let mut config = SupabaseConfig::new(server.uri(), "service-key");
        config.retry = RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 2,
        };
        SupabaseClient::new(config).unwrap()
    }

    #[test]
    #[serial]
    fn test_config_from_env_requires_url() {
        std::env::remove_var("SUPABASE_URL");
        assert!(SupabaseConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var("SUPABASE_URL", "https://abc.supabase.co/");
        std::env::set_var("SUPABASE_SERVICE_ROLE_KEY", "k");
        std::env::remove_var("SUPABASE_TIMEOUT_SECS");
        let config = SupabaseConfig::from_env().unwrap();
        assert_eq!(config.url, "https://abc.supabase.co");
        assert_eq!(config.timeout, Duration::from_secs(30));
        std::env::remove_var("SUPABASE_URL");
        std::env::remove_var("SUPABASE_SERVICE_ROLE_KEY");
    }

    #[tokio::test]
    async fn test_select_sends_filters_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("id", "eq.user-1"))
            .and(query_param("select", "*"))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "user-1" }])))
            .mount(&server)
            .await;

        let rows: Vec<Value> = client(&server)
            .select("profiles", &Query::new().eq("id", "user-1"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_update_returns_matched_rows() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/redeem_codes"))
            .and(query_param("code", "eq.VIP30"))
            .and(query_param("is_used", "eq.false"))
            .and(header("prefer", "return=representation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let rows: Vec<Value> = client(&server)
            .update(
                "redeem_codes",
                &Query::new().eq("code", "VIP30").eq("is_used", false),
                &json!({ "is_used": true }),
            )
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_unfiltered_writes_are_refused() {
        let server = MockServer::start().await;
        let c = client(&server);
        let err = c.delete("projects", &Query::new()).await.unwrap_err();
        assert!(matches!(err, SupabaseError::InvalidQuery(_)));
        let err = c
            .update::<_, Value>("projects", &Query::new(), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, SupabaseError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/license_keys"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/license_keys"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let rows: Vec<Value> = client(&server)
            .select("license_keys", &Query::new().eq("device_id", "d1"))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/projects"))
            .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .insert::<_, Value>("projects", &json!({ "shop_name": "x" }))
            .await
            .unwrap_err();
        assert!(matches!(err, SupabaseError::Conflict(_)));
    }
}
