//! Script generation on top of the chat-completions client.

use tracing::{info, warn};

use shopreel_models::{
    DirectScriptRequest, HookScriptRequest, IdeasRequest, IdeasResult, ScriptParseError,
    ScriptResult, ShopProfile,
};
use shopreel_providers::{ChatMessage, LlmClient, TextStream};

use crate::error::{ApiError, ApiResult};
use crate::services::prompts;

/// Turns requests into prompts and model output into typed results.
#[derive(Clone)]
pub struct ScriptWriter {
    llm: LlmClient,
}

impl ScriptWriter {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// One-shot JSON storyboard.
    pub async fn direct(&self, request: &DirectScriptRequest) -> ApiResult<ScriptResult> {
        let messages = [
            ChatMessage::system(prompts::SCRIPT_SYSTEM_PROMPT),
            ChatMessage::user(prompts::direct_script_prompt(
                &request.shop_profile,
                request.script_type,
                request.conversion_goal,
                &request.topic,
            )),
        ];
        let raw = self.llm.complete_json(&messages).await?;
        let script = ScriptResult::from_llm_output(&raw).map_err(|e| parse_failure(e, &raw))?;
        info!(
            title = %script.title,
            shots = script.script_list.len(),
            "Script generated"
        );
        Ok(script)
    }

    /// Hook suggestions for the two-step flow.
    pub async fn ideas(&self, request: &IdeasRequest) -> ApiResult<IdeasResult> {
        let messages = [
            ChatMessage::system(prompts::IDEAS_SYSTEM_PROMPT),
            ChatMessage::user(prompts::ideas_prompt(&request.industry, &request.location)),
        ];
        let raw = self.llm.complete_json(&messages).await?;
        IdeasResult::from_llm_output(&raw).map_err(|e| match e {
            ScriptParseError::MissingFields => {
                ApiError::generation("AI 返回格式不符合要求", "缺少必要的字段: ammo_boxes")
            }
            other => parse_failure(other, &raw),
        })
    }

    /// Markdown script built around the chosen hook.
    pub async fn hook_script(&self, request: &HookScriptRequest) -> ApiResult<String> {
        Ok(self.llm.complete(&hook_messages(request)).await?)
    }

    /// Same as [`hook_script`](Self::hook_script), streamed as text deltas.
    pub async fn hook_script_stream(&self, request: &HookScriptRequest) -> ApiResult<TextStream> {
        Ok(self.llm.stream(&hook_messages(request)).await?)
    }

    /// Markdown rewrite of a transcript for the caller's shop.
    pub async fn rewrite(&self, transcript: &str, shop: &ShopProfile) -> ApiResult<String> {
        let messages = [
            ChatMessage::system(prompts::REWRITE_SYSTEM_PROMPT),
            ChatMessage::user(prompts::rewrite_prompt(transcript, shop)),
        ];
        self.llm
            .complete(&messages)
            .await
            .map_err(|e| ApiError::internal(format!("生成仿写内容失败: {e}")))
    }
}

fn hook_messages(request: &HookScriptRequest) -> [ChatMessage; 2] {
    [
        ChatMessage::system(prompts::HOOK_SCRIPT_SYSTEM_PROMPT),
        ChatMessage::user(prompts::hook_script_prompt(
            &request.industry,
            &request.location,
            &request.selected_hook,
        )),
    ]
}

fn parse_failure(error: ScriptParseError, raw: &str) -> ApiError {
    warn!(error = %error, output = %raw, "Unusable model output");
    match error {
        ScriptParseError::MissingFields => ApiError::generation(
            "AI 返回格式不符合要求",
            "缺少必要的字段: title, cover_text, script_list",
        ),
        ScriptParseError::NoJson | ScriptParseError::InvalidJson(_) => {
            ApiError::generation("AI 返回格式错误", "无法解析 AI 返回的 JSON 格式")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shopreel_models::{ConversionGoal, ScriptType};
    use shopreel_providers::LlmConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn writer(server: &MockServer) -> ScriptWriter {
        let config = LlmConfig::new("sk-test").with_base_url(server.uri());
        ScriptWriter::new(LlmClient::new(config).unwrap())
    }

    fn completion(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
    }

    fn direct_request() -> DirectScriptRequest {
        DirectScriptRequest {
            script_type: ScriptType::VisitReason,
            conversion_goal: ConversionGoal::Trust,
            topic: "周末活动".into(),
            shop_profile: ShopProfile {
                id: None,
                user_id: String::new(),
                shop_name: "小美美甲".into(),
                category: "美业".into(),
                target_audience: "学生".into(),
                unique_selling_point: "款式多".into(),
                boss_persona: "温柔".into(),
            },
            device_id: None,
        }
    }

    #[tokio::test]
    async fn test_direct_parses_fenced_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({ "response_format": { "type": "json_object" } })))
            .respond_with(completion(
                "```json\n{\"title\":\"周末来做指甲\",\"cover_text\":\"三十分钟出门\",\"script_list\":[{\"visual\":\"门头\",\"audio\":\"来\",\"emotion\":\"热情\"}]}\n```",
            ))
            .mount(&server)
            .await;

        let script = writer(&server).direct(&direct_request()).await.unwrap();
        assert_eq!(script.title, "周末来做指甲");
        assert_eq!(script.script_list.len(), 1);
    }

    #[tokio::test]
    async fn test_direct_missing_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(completion("{\"title\":\"只有标题\"}"))
            .mount(&server)
            .await;

        let err = writer(&server).direct(&direct_request()).await.unwrap_err();
        match err {
            ApiError::Generation { error, .. } => assert_eq!(error, "AI 返回格式不符合要求"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_ideas_requires_ammo_boxes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(completion("{\"reply\":\"好的\",\"ammo_boxes\":[]}"))
            .mount(&server)
            .await;

        let request = IdeasRequest {
            industry: "美发".into(),
            location: "杭州".into(),
        };
        let err = writer(&server).ideas(&request).await.unwrap_err();
        assert!(matches!(err, ApiError::Generation { .. }));
    }
}
