//! Request bodies for the HTTP API.
//!
//! Endpoints that multiplex several operations over one path (`/api/generate`,
//! `/api/parse-video`) take a tagged union so each variant is validated on
//! its own terms.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::assets::AssetKind;
use crate::script::{ConversionGoal, ScriptType, ShopProfile};
use crate::video::{AspectRatio, SoraShotType, DEFAULT_SORA_DURATION_SECS};

/// A request body that could not be accepted.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid request body: {0}")]
    Malformed(String),

    #[error("missing required field: {0}")]
    Missing(&'static str),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

impl From<serde_json::Error> for RequestError {
    fn from(e: serde_json::Error) -> Self {
        RequestError::Malformed(e.to_string())
    }
}

fn require(value: &str, field: &'static str) -> Result<(), RequestError> {
    if value.trim().is_empty() {
        Err(RequestError::Missing(field))
    } else {
        Ok(())
    }
}

// ============================================================================
// /api/generate
// ============================================================================

/// Body of `POST /api/generate`, discriminated by `step`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum GenerateRequest {
    /// One-shot JSON storyboard (quota-gated).
    Direct(DirectScriptRequest),
    /// First step of the two-step flow: hook suggestions.
    Ideas(IdeasRequest),
    /// Second step: a Markdown script built around a chosen hook.
    Script(HookScriptRequest),
}

impl GenerateRequest {
    /// Parse a raw body; a body without `step` is a direct request.
    pub fn from_value(mut value: serde_json::Value) -> Result<Self, RequestError> {
        let obj = value
            .as_object_mut()
            .ok_or_else(|| RequestError::Malformed("expected a JSON object".to_string()))?;
        if !obj.contains_key("step") {
            obj.insert("step".to_string(), serde_json::Value::from("direct"));
        }
        let request: GenerateRequest = serde_json::from_value(value)?;
        request.check()?;
        Ok(request)
    }

    fn check(&self) -> Result<(), RequestError> {
        match self {
            GenerateRequest::Direct(r) => {
                require(&r.topic, "topic")?;
                r.shop_profile.validate()?;
                Ok(())
            }
            GenerateRequest::Ideas(r) => {
                require(&r.industry, "industry")?;
                require(&r.location, "location")
            }
            GenerateRequest::Script(r) => {
                require(&r.industry, "industry")?;
                require(&r.location, "location")?;
                require(&r.selected_hook, "selected_hook")
            }
        }
    }

    pub fn step_name(&self) -> &'static str {
        match self {
            GenerateRequest::Direct(_) => "direct",
            GenerateRequest::Ideas(_) => "ideas",
            GenerateRequest::Script(_) => "script",
        }
    }
}

/// Single JSON storyboard for a shop profile.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectScriptRequest {
    pub script_type: ScriptType,
    pub conversion_goal: ConversionGoal,
    pub topic: String,
    pub shop_profile: ShopProfile,
    /// Anonymous device id used for license lookups when not logged in.
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct IdeasRequest {
    pub industry: String,
    pub location: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct HookScriptRequest {
    pub industry: String,
    pub location: String,
    pub selected_hook: String,
    /// Stream Markdown as `text/plain` instead of returning `{content}`.
    #[serde(default)]
    pub stream: bool,
}

// ============================================================================
// /api/parse-video
// ============================================================================

/// Body of `POST /api/parse-video`, discriminated by `action`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ParseVideoRequest {
    /// Resolve a share link to an MP4 and transcribe it.
    ExtractAndTranscribe(TranscribeRequest),
    /// Rewrite a transcript for the caller's shop (members only).
    GenerateRewrite(RewriteRequest),
}

impl ParseVideoRequest {
    pub fn from_value(value: serde_json::Value) -> Result<Self, RequestError> {
        let request: ParseVideoRequest = serde_json::from_value(value)?;
        match &request {
            ParseVideoRequest::ExtractAndTranscribe(r) => require(&r.video_url, "videoUrl")?,
            ParseVideoRequest::GenerateRewrite(r) => {
                require(&r.extracted_text, "extractedText")?;
                r.shop_profile.validate()?;
            }
        }
        Ok(request)
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeRequest {
    /// Pasted share text; the first http(s) link in it is used.
    pub video_url: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewriteRequest {
    pub extracted_text: String,
    pub shop_profile: ShopProfile,
}

// ============================================================================
// Video generation
// ============================================================================

/// Body of `POST /api/generate-digital-video`.
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct DigitalVideoRequest {
    #[validate(length(min = 1, max = 5000))]
    pub text: String,
    /// Voice alias or provider voice id.
    #[validate(length(min = 1))]
    pub voice_id: String,
    #[validate(url)]
    pub video_url: String,
    /// TTS model override.
    #[serde(default)]
    pub model: Option<String>,
}

/// Body of `POST /api/sora-generate`.
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SoraGenerateRequest {
    #[validate(url)]
    pub image_url: String,
    #[validate(length(min = 1, max = 4000))]
    pub prompt: String,
    #[serde(rename = "type")]
    pub shot_type: SoraShotType,
    pub ratio: AspectRatio,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 60))]
    pub duration: Option<u32>,
}

impl SoraGenerateRequest {
    pub fn duration_secs(&self) -> u32 {
        self.duration.unwrap_or(DEFAULT_SORA_DURATION_SECS)
    }
}

// ============================================================================
// Assets, membership, projects
// ============================================================================

/// Body of `POST /api/digital-assets`.
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssetUpdateRequest {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    #[validate(url)]
    pub url: String,
}

/// Body of `POST /api/redeem`.
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct RedeemRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
}

/// Partial update of a shop profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub shop_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub target_audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub unique_selling_point: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub boss_persona: Option<String>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.shop_name.is_none()
            && self.category.is_none()
            && self.target_audience.is_none()
            && self.unique_selling_point.is_none()
            && self.boss_persona.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shop() -> serde_json::Value {
        json!({
            "shop_name": "老王面馆",
            "category": "餐饮",
            "target_audience": "上班族",
            "unique_selling_point": "手工拉面",
            "boss_persona": "实在人"
        })
    }

    #[test]
    fn test_generate_without_step_is_direct() {
        let body = json!({
            "scriptType": "口播",
            "conversionGoal": "卖货",
            "topic": "新品上市",
            "shopProfile": shop(),
        });
        let req = GenerateRequest::from_value(body).unwrap();
        match req {
            GenerateRequest::Direct(r) => {
                assert_eq!(r.script_type, ScriptType::Voiceover);
                assert_eq!(r.conversion_goal, ConversionGoal::Sales);
                assert!(r.device_id.is_none());
            }
            other => panic!("expected direct, got {}", other.step_name()),
        }
    }

    #[test]
    fn test_generate_direct_missing_topic() {
        let body = json!({
            "scriptType": "口播",
            "conversionGoal": "卖货",
            "topic": "  ",
            "shopProfile": shop(),
        });
        let err = GenerateRequest::from_value(body).unwrap_err();
        assert!(matches!(err, RequestError::Missing("topic")));
    }

    #[test]
    fn test_generate_ideas_and_script_steps() {
        let ideas = GenerateRequest::from_value(json!({
            "step": "ideas", "industry": "美发", "location": "杭州"
        }))
        .unwrap();
        assert_eq!(ideas.step_name(), "ideas");

        let script = GenerateRequest::from_value(json!({
            "step": "script", "industry": "美发", "location": "杭州",
            "selected_hook": "你剪的不是头发", "stream": true
        }))
        .unwrap();
        match script {
            GenerateRequest::Script(r) => assert!(r.stream),
            other => panic!("expected script, got {}", other.step_name()),
        }
    }

    #[test]
    fn test_generate_script_requires_hook() {
        let err = GenerateRequest::from_value(json!({
            "step": "script", "industry": "美发", "location": "杭州", "selected_hook": ""
        }))
        .unwrap_err();
        assert!(matches!(err, RequestError::Missing("selected_hook")));
    }

    #[test]
    fn test_generate_unknown_step_rejected() {
        let err = GenerateRequest::from_value(json!({"step": "poem"})).unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));

        let err = GenerateRequest::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));
    }

    #[test]
    fn test_parse_video_actions() {
        let req = ParseVideoRequest::from_value(json!({
            "action": "extract-and-transcribe",
            "videoUrl": "7.43 复制打开抖音 https://v.douyin.com/abc/ 看看"
        }))
        .unwrap();
        assert!(matches!(req, ParseVideoRequest::ExtractAndTranscribe(_)));

        let req = ParseVideoRequest::from_value(json!({
            "action": "generate-rewrite",
            "extractedText": "原文",
            "shopProfile": shop(),
        }))
        .unwrap();
        assert!(matches!(req, ParseVideoRequest::GenerateRewrite(_)));

        let err = ParseVideoRequest::from_value(json!({"action": "dance"})).unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));
    }

    #[test]
    fn test_sora_request_defaults() {
        let req: SoraGenerateRequest = serde_json::from_value(json!({
            "imageUrl": "https://img.example.com/shop.jpg",
            "prompt": "热闹的面馆",
            "type": "store",
            "ratio": "9:16"
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.duration_secs(), 15);
        assert_eq!(req.shot_type, SoraShotType::Store);
    }

    #[test]
    fn test_asset_request_rejects_bad_type() {
        let result: Result<AssetUpdateRequest, _> = serde_json::from_value(json!({
            "userId": "u1", "type": "image", "url": "https://x/y.png"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_project_patch_validation() {
        let patch = ProjectPatch {
            shop_name: Some(String::new()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
        assert!(ProjectPatch::default().is_empty());
    }
}
