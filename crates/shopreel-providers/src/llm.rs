//! OpenAI-compatible chat completions client (DeepSeek by default).

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{build_client, env_opt, env_secs, json_body, send};

const PROVIDER: &str = "llm";

/// Stream of text deltas from a streamed completion.
pub type TextStream = BoxStream<'static, ProviderResult<String>>;

/// LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Script-writing model: `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OPENAI_MODEL`.
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = env_opt("OPENAI_API_KEY")
            .ok_or_else(|| ProviderError::not_configured(PROVIDER, "OPENAI_API_KEY not set"))?;
        Ok(Self::load(api_key, "OPENAI_BASE_URL", "OPENAI_MODEL"))
    }

    /// Prompt-director model for Sora: `DEEPSEEK_API_KEY`. Optional.
    pub fn director_from_env() -> Option<Self> {
        env_opt("DEEPSEEK_API_KEY").map(|key| Self::load(key, "DEEPSEEK_BASE_URL", "DEEPSEEK_MODEL"))
    }

    fn load(api_key: String, base_url_var: &str, model_var: &str) -> Self {
        let mut config = Self::new(api_key);
        if let Some(base_url) = env_opt(base_url_var) {
            config = config.with_base_url(base_url);
        }
        if let Some(model) = env_opt(model_var) {
            config.model = model;
        }
        config.timeout = env_secs("LLM_TIMEOUT_SECS", 120);
        config
    }
}

/// One chat message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// Chat completions client.
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> ProviderResult<Self> {
        Ok(Self {
            http: build_client(config.timeout)?,
            config,
        })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(LlmConfig::from_env()?)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Plain text completion.
    pub async fn complete(&self, messages: &[ChatMessage]) -> ProviderResult<String> {
        self.complete_inner(messages, false).await
    }

    /// Completion constrained to a JSON object.
    pub async fn complete_json(&self, messages: &[ChatMessage]) -> ProviderResult<String> {
        self.complete_inner(messages, true).await
    }

    async fn complete_inner(&self, messages: &[ChatMessage], json_mode: bool) -> ProviderResult<String> {
        let body = self.request_body(messages, json_mode, false);
        let request = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body);
        let response = send(PROVIDER, "chat", request).await?;
        let value = json_body(PROVIDER, response).await?;

        let content = value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "no message content"))?;
        debug!(model = %self.config.model, chars = content.chars().count(), "Completion received");
        Ok(content.to_string())
    }

    /// Streamed completion yielding content deltas as they arrive.
    pub async fn stream(&self, messages: &[ChatMessage]) -> ProviderResult<TextStream> {
        let body = self.request_body(messages, false, true);
        let request = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body);
        let response = send(PROVIDER, "chat_stream", request).await?;

        let state = SseReader {
            bytes: response
                .bytes_stream()
                .map(|chunk| chunk.map(|b| b.to_vec()))
                .boxed(),
            buffer: Vec::new(),
            pending: VecDeque::new(),
            done: false,
        };

        Ok(stream::unfold(state, |mut state| async move {
            loop {
                if let Some(delta) = state.pending.pop_front() {
                    return Some((Ok(delta), state));
                }
                if state.done {
                    return None;
                }
                match state.bytes.next().await {
                    Some(Ok(chunk)) => {
                        state.buffer.extend_from_slice(&chunk);
                        state.drain_lines(false);
                    }
                    Some(Err(e)) => {
                        state.done = true;
                        return Some((Err(ProviderError::Network(e)), state));
                    }
                    None => {
                        state.drain_lines(true);
                        state.done = true;
                    }
                }
            }
        })
        .boxed())
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn request_body(&self, messages: &[ChatMessage], json_mode: bool, stream: bool) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });
        if json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }
        if stream {
            body["stream"] = json!(true);
        }
        body
    }
}

struct SseReader {
    bytes: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    done: bool,
}

impl SseReader {
    /// Move every complete line out of the buffer. Lines are split on raw bytes
    /// so multi-byte characters cut across chunks stay intact.
    fn drain_lines(&mut self, at_eof: bool) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.handle_line(&String::from_utf8_lossy(&line));
        }
        if at_eof && !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.handle_line(&String::from_utf8_lossy(&rest));
        }
    }

    fn handle_line(&mut self, line: &str) {
        if self.done {
            return;
        }
        match parse_sse_line(line) {
            SseLine::Delta(text) => self.pending.push_back(text),
            SseLine::Done => self.done = true,
            SseLine::Skip => {}
        }
    }
}

/// One line of an OpenAI-style event stream.
#[derive(Debug, PartialEq, Eq)]
pub enum SseLine {
    Delta(String),
    Done,
    Skip,
}

pub fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }
    serde_json::from_str::<Value>(data)
        .ok()
        .and_then(|v| {
            v.pointer("/choices/0/delta/content")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .map(SseLine::Delta)
        .unwrap_or(SseLine::Skip)
}
