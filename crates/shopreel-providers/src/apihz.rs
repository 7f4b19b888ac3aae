//! APIHZ share-link resolver (Douyin and similar short-video platforms).

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{build_client, env_opt, env_secs, json_body, send};

const PROVIDER: &str = "apihz";

/// Browser UA; the resolver and the video CDNs reject unknown agents.
pub(crate) const BROWSER_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

static SHARE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://[^\s]+").unwrap());

/// Pull the first http(s) link out of pasted share text.
///
/// Share text usually wraps the link in a caption and emoji.
pub fn extract_share_url(raw: &str) -> Option<&str> {
    SHARE_URL.find(raw).map(|m| m.as_str().trim())
}

/// APIHZ configuration.
#[derive(Debug, Clone)]
pub struct ApiHzConfig {
    pub id: String,
    pub key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl ApiHzConfig {
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            base_url: "https://cn.apihz.cn".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_env() -> ProviderResult<Self> {
        let (Some(id), Some(key)) = (env_opt("APIHZ_ID"), env_opt("APIHZ_KEY")) else {
            return Err(ProviderError::not_configured(PROVIDER, "APIHZ_ID / APIHZ_KEY not set"));
        };
        let mut config = Self::new(id, key);
        if let Some(base_url) = env_opt("APIHZ_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        config.timeout = env_secs("APIHZ_TIMEOUT_SECS", 30);
        Ok(config)
    }
}

/// Resolves share links to direct MP4 URLs.
#[derive(Clone)]
pub struct ApiHzClient {
    http: Client,
    config: ApiHzConfig,
}

impl ApiHzClient {
    pub fn new(config: ApiHzConfig) -> ProviderResult<Self> {
        Ok(Self {
            http: build_client(config.timeout)?,
            config,
        })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(ApiHzConfig::from_env()?)
    }

    /// Resolve pasted share text to a direct video URL.
    pub async fn resolve_video_url(&self, share_text: &str) -> ProviderResult<String> {
        let link = extract_share_url(share_text)
            .ok_or_else(|| ProviderError::invalid_input("未检测到有效链接，请输入正确的视频 URL"))?;

        let request = self
            .http
            .get(format!("{}/api/fun/douyin.php", self.config.base_url))
            .query(&[
                ("id", self.config.id.as_str()),
                ("key", self.config.key.as_str()),
                ("url", link),
            ])
            .header(USER_AGENT, BROWSER_UA);
        let response = send(PROVIDER, "resolve", request).await?;
        let value = json_body(PROVIDER, response).await?;

        let video = parse_resolver_reply(&value)?;
        info!(link, "Share link resolved");
        Ok(video)
    }
}

/// Interpret a resolver reply: `code == 200` plus `video` or `data.video`.
pub fn parse_resolver_reply(value: &Value) -> ProviderResult<String> {
    let code_ok = match value.get("code") {
        Some(Value::Number(n)) => n.as_i64() == Some(200),
        Some(Value::String(s)) => s == "200",
        _ => false,
    };
    let video = value
        .get("video")
        .or_else(|| value.pointer("/data/video"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());

    match (code_ok, video) {
        (true, Some(video)) => Ok(video.to_string()),
        _ => {
            let msg = value
                .get("msg")
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("接口未返回视频");
            Err(ProviderError::invalid_response(PROVIDER, msg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_extract_share_url() {
        let share = "7.43 复制打开抖音，看看【老王面馆的作品】# 美食 https://v.douyin.com/iRNBho6u/ a@b.Nq 06/12";
        assert_eq!(extract_share_url(share), Some("https://v.douyin.com/iRNBho6u/"));
        assert_eq!(extract_share_url("没有链接"), None);
    }

    #[test]
    fn test_parse_resolver_reply() {
        assert_eq!(
            parse_resolver_reply(&json!({ "code": 200, "video": "https://cdn/v.mp4" })).unwrap(),
            "https://cdn/v.mp4"
        );
        assert_eq!(
            parse_resolver_reply(&json!({ "code": "200", "data": { "video": "https://cdn/w.mp4" } })).unwrap(),
            "https://cdn/w.mp4"
        );
        let err = parse_resolver_reply(&json!({ "code": 400, "msg": "链接解析失败" })).unwrap_err();
        assert!(err.to_string().contains("链接解析失败"));
    }

    #[tokio::test]
    async fn test_resolve_video_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/fun/douyin.php"))
            .and(query_param("id", "10001"))
            .and(query_param("url", "https://v.douyin.com/abc/"))
            .and(header("user-agent", BROWSER_UA))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "video": "https://cdn.example/abc.mp4"
            })))
            .mount(&server)
            .await;

        let client = ApiHzClient::new(ApiHzConfig::new("10001", "secret").with_base_url(server.uri())).unwrap();
        let url = client
            .resolve_video_url("看看这个 https://v.douyin.com/abc/ 复制此链接")
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example/abc.mp4");
    }

    #[tokio::test]
    async fn test_resolve_without_link_skips_request() {
        let client = ApiHzClient::new(ApiHzConfig::new("1", "k").with_base_url("http://127.0.0.1:9")).unwrap();
        let err = client.resolve_video_url("只有文字").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidInput(_)));
    }
}
