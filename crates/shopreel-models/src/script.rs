//! Marketing script types and LLM output parsing.

use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// Matches a fenced ```json block, any fenced block, or the outermost braces.
static JSON_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\n?(.*?)\n?```|```(.*?)```|(\{.*\})").unwrap()
});

/// One shot of a short-video script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScriptSegment {
    /// What is on screen.
    #[serde(default)]
    pub visual: String,
    /// Spoken line.
    #[serde(default)]
    pub audio: String,
    /// Delivery / emotion cue.
    #[serde(default)]
    pub emotion: String,
}

/// A complete storyboard script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScriptResult {
    pub title: String,
    pub cover_text: String,
    pub script_list: Vec<ScriptSegment>,
}

/// Why LLM output could not be turned into a script.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptParseError {
    #[error("no JSON content found in model output")]
    NoJson,

    #[error("model output is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("model output is missing required fields: title, cover_text, script_list")]
    MissingFields,
}

impl ScriptResult {
    /// Parse a script out of raw model text, tolerating Markdown fences.
    pub fn from_llm_output(raw: &str) -> Result<Self, ScriptParseError> {
        let json = extract_json_block(raw).ok_or(ScriptParseError::NoJson)?;
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| ScriptParseError::InvalidJson(e.to_string()))?;

        let has_text = |key: &str| {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .is_some_and(|s| !s.is_empty())
        };
        if !has_text("title")
            || !has_text("cover_text")
            || !value.get("script_list").is_some_and(|v| v.is_array())
        {
            return Err(ScriptParseError::MissingFields);
        }

        serde_json::from_value(value).map_err(|e| ScriptParseError::InvalidJson(e.to_string()))
    }
}

/// Pull the JSON payload out of model text.
///
/// Prefers a ```json fence, then any fence, then the outermost `{...}` span.
/// Falls back to the whole trimmed input when nothing matches.
pub fn extract_json_block(raw: &str) -> Option<&str> {
    let extracted = match JSON_BLOCK.captures(raw) {
        Some(caps) => caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str()),
        None => Some(raw),
    };
    extracted.map(str::trim).filter(|s| !s.is_empty())
}

/// What the video should convert viewers into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ConversionGoal {
    /// Grow followers.
    #[serde(rename = "涨粉")]
    Followers,
    /// Drive sales.
    #[serde(rename = "卖货")]
    Sales,
    /// Build trust.
    #[serde(rename = "信任")]
    Trust,
}

impl ConversionGoal {
    pub fn label(&self) -> &'static str {
        match self {
            ConversionGoal::Followers => "涨粉",
            ConversionGoal::Sales => "卖货",
            ConversionGoal::Trust => "信任",
        }
    }
}

/// Script format requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ScriptType {
    #[serde(rename = "✨ 灵感一闪", alias = "灵感一闪")]
    Inspiration,
    #[serde(rename = "人设故事")]
    PersonaStory,
    #[serde(rename = "进店理由")]
    VisitReason,
    #[serde(rename = "观点输出")]
    Opinion,
    #[serde(rename = "口播")]
    Voiceover,
    #[serde(rename = "爆款选题")]
    TrendingTopic,
    #[serde(rename = "爆款仿写")]
    TrendingRemix,
}

impl ScriptType {
    pub fn label(&self) -> &'static str {
        match self {
            ScriptType::Inspiration => "✨ 灵感一闪",
            ScriptType::PersonaStory => "人设故事",
            ScriptType::VisitReason => "进店理由",
            ScriptType::Opinion => "观点输出",
            ScriptType::Voiceover => "口播",
            ScriptType::TrendingTopic => "爆款选题",
            ScriptType::TrendingRemix => "爆款仿写",
        }
    }
}

/// A shop profile ("project"); row of the `projects` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ShopProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: String,
    #[validate(length(min = 1, max = 100))]
    pub shop_name: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub target_audience: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub unique_selling_point: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub boss_persona: String,
}

/// A themed group of opening hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AmmoBox {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub hooks: Vec<String>,
}

/// First step of the two-step flow: a chat reply plus hook suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IdeasResult {
    #[serde(default)]
    pub reply: String,
    #[serde(default)]
    pub ammo_boxes: Vec<AmmoBox>,
}

impl IdeasResult {
    pub fn from_llm_output(raw: &str) -> Result<Self, ScriptParseError> {
        let json = extract_json_block(raw).ok_or(ScriptParseError::NoJson)?;
        let ideas: IdeasResult =
            serde_json::from_str(json).map_err(|e| ScriptParseError::InvalidJson(e.to_string()))?;
        if ideas.ammo_boxes.is_empty() {
            return Err(ScriptParseError::MissingFields);
        }
        Ok(ideas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT_JSON: &str = r#"{"title":"T","cover_text":"C","script_list":[{"visual":"v","audio":"a","emotion":"e"}]}"#;

    #[test]
    fn test_extract_plain_json() {
        assert_eq!(extract_json_block(SCRIPT_JSON), Some(SCRIPT_JSON));
    }

    #[test]
    fn test_extract_fenced_json() {
        let raw = format!("Here you go:\n```json\n{SCRIPT_JSON}\n```\nEnjoy");
        assert_eq!(extract_json_block(&raw), Some(SCRIPT_JSON));

        let raw = format!("```\n{SCRIPT_JSON}\n```");
        assert_eq!(extract_json_block(&raw), Some(SCRIPT_JSON));
    }

    #[test]
    fn test_extract_embedded_braces() {
        let raw = format!("prefix text {SCRIPT_JSON} suffix");
        assert_eq!(extract_json_block(&raw), Some(SCRIPT_JSON));
    }

    #[test]
    fn test_extract_empty() {
        assert_eq!(extract_json_block("   "), None);
    }

    #[test]
    fn test_script_from_llm_output() {
        let raw = format!("```json\n{SCRIPT_JSON}\n```");
        let script = ScriptResult::from_llm_output(&raw).unwrap();
        assert_eq!(script.title, "T");
        assert_eq!(script.script_list.len(), 1);
        assert_eq!(script.script_list[0].emotion, "e");
    }

    #[test]
    fn test_script_missing_fields() {
        let err = ScriptResult::from_llm_output(r#"{"title":"T","script_list":[]}"#).unwrap_err();
        assert_eq!(err, ScriptParseError::MissingFields);

        let err = ScriptResult::from_llm_output("not json at all").unwrap_err();
        assert!(matches!(err, ScriptParseError::InvalidJson(_)));
    }

    #[test]
    fn test_ideas_from_llm_output() {
        let raw = r#"{"reply":"好的","ammo_boxes":[{"type":"痛点","hooks":["a","b"]}]}"#;
        let ideas = IdeasResult::from_llm_output(raw).unwrap();
        assert_eq!(ideas.ammo_boxes[0].kind, "痛点");
        assert_eq!(ideas.ammo_boxes[0].hooks.len(), 2);
    }

    #[test]
    fn test_enum_labels_round_trip_through_serde() {
        let goal: ConversionGoal = serde_json::from_str("\"卖货\"").unwrap();
        assert_eq!(goal, ConversionGoal::Sales);

        let ty: ScriptType = serde_json::from_str("\"灵感一闪\"").unwrap();
        assert_eq!(ty, ScriptType::Inspiration);
        assert_eq!(
            serde_json::to_string(&ScriptType::Voiceover).unwrap(),
            "\"口播\""
        );
    }
}
