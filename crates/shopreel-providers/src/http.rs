//! Shared HTTP plumbing: client construction and instrumented sends.

use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, Response};
use tracing::{info_span, warn, Instrument};

use crate::error::{ProviderError, ProviderResult};
use crate::metrics::record_call;

/// Build a pooled client with the given request timeout.
pub fn build_client(timeout: Duration) -> ProviderResult<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .user_agent(concat!("shopreel/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ProviderError::Network)
}

/// Send a request with a tracing span and metrics.
///
/// Non-2xx responses become [`ProviderError::Upstream`] carrying the body text.
pub async fn send(
    provider: &'static str,
    operation: &'static str,
    request: RequestBuilder,
) -> ProviderResult<Response> {
    let span = info_span!("provider_request", provider, operation);
    let started = Instant::now();

    let result = request.send().instrument(span).await;
    let elapsed = started.elapsed();

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            record_call(provider, operation, 0, elapsed);
            warn!(provider, operation, error = %e, "Provider request failed");
            return Err(ProviderError::Network(e));
        }
    };

    let status = response.status();
    record_call(provider, operation, status.as_u16(), elapsed);

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(
        provider,
        operation,
        status = status.as_u16(),
        body = %truncate(&body, 500),
        "Provider returned error status"
    );
    Err(ProviderError::Upstream {
        provider,
        status: status.as_u16(),
        body,
    })
}

/// Read a JSON body, reporting parse failures against the provider.
pub async fn json_body(provider: &'static str, response: Response) -> ProviderResult<serde_json::Value> {
    let text = response.text().await?;
    serde_json::from_str(&text)
        .map_err(|e| ProviderError::invalid_response(provider, format!("{e}: {}", truncate(&text, 200))))
}

/// Cut `s` to at most `max` bytes on a char boundary.
pub fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Read an env var, treating blank values as unset.
pub(crate) fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(
        std::env::var(key)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 3), "hel");
        // each CJK char is 3 bytes
        assert_eq!(truncate("你好世界", 4), "你");
    }
}
