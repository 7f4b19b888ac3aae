//! Per-user digital assets (cloned voice id, base video URL).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Which asset an upload updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Reference video for the digital human.
    Video,
    /// Voice sample; triggers voice cloning enrollment.
    Audio,
}

/// Row of the `user_digital_assets` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UserDigitalAssets {
    #[serde(
        default,
        deserialize_with = "deserialize_row_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub default_video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Row ids may be uuids or serial integers depending on the table setup.
fn deserialize_row_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// The writes needed to apply one asset update.
///
/// Rows are unique per user only by convention, so a write first removes any
/// duplicates (keeping the first row returned) and then updates that row or
/// inserts a new one. The untouched asset is carried over from the kept row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetWritePlan {
    /// Row to update; `None` means insert.
    pub target_id: Option<String>,
    /// Duplicate rows to delete.
    pub duplicate_ids: Vec<String>,
    /// Duplicate rows without an id; they cannot be addressed for deletion.
    pub unidentified_duplicates: usize,
    /// Full row contents to write.
    pub row: UserDigitalAssets,
}

impl AssetWritePlan {
    /// Plan a write of `value` (a video URL or an enrolled voice id).
    pub fn new(
        existing: &[UserDigitalAssets],
        user_id: &str,
        kind: AssetKind,
        value: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let kept = existing.first();
        let duplicate_ids: Vec<String> = existing
            .iter()
            .skip(1)
            .filter_map(|row| row.id.clone())
            .collect();
        let unidentified_duplicates = existing.len().saturating_sub(1) - duplicate_ids.len();

        let mut row = UserDigitalAssets {
            id: None,
            user_id: user_id.to_string(),
            voice_id: kept.and_then(|r| r.voice_id.clone()),
            default_video_url: kept.and_then(|r| r.default_video_url.clone()),
            updated_at: Some(now),
        };
        match kind {
            AssetKind::Video => row.default_video_url = Some(value.into()),
            AssetKind::Audio => row.voice_id = Some(value.into()),
        }

        Self {
            target_id: kept.and_then(|r| r.id.clone()),
            duplicate_ids,
            unidentified_duplicates,
            row,
        }
    }

    pub fn is_insert(&self) -> bool {
        self.target_id.is_none()
    }
}

/// Voice-enrollment prefix for a user: `u` plus the first 8 ASCII alphanumerics of the id.
pub fn voice_prefix(user_id: &str) -> String {
    let safe: String = user_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect();
    format!("u{safe}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, voice: Option<&str>, video: Option<&str>) -> UserDigitalAssets {
        UserDigitalAssets {
            id: Some(id.to_string()),
            user_id: "user-1".to_string(),
            voice_id: voice.map(str::to_string),
            default_video_url: video.map(str::to_string),
            updated_at: None,
        }
    }

    #[test]
    fn test_plan_insert_when_no_rows() {
        let plan = AssetWritePlan::new(&[], "user-1", AssetKind::Video, "https://v.mp4", Utc::now());
        assert!(plan.is_insert());
        assert!(plan.duplicate_ids.is_empty());
        assert_eq!(plan.unidentified_duplicates, 0);
        assert_eq!(plan.row.default_video_url.as_deref(), Some("https://v.mp4"));
        assert!(plan.row.voice_id.is_none());
    }

    #[test]
    fn test_plan_keeps_first_and_deletes_rest() {
        let rows = vec![
            row("a", Some("voice-a"), None),
            row("b", None, Some("https://old-b.mp4")),
            row("c", None, None),
        ];
        let plan = AssetWritePlan::new(&rows, "user-1", AssetKind::Video, "https://new.mp4", Utc::now());

        assert_eq!(plan.target_id.as_deref(), Some("a"));
        assert_eq!(plan.duplicate_ids, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(plan.row.voice_id.as_deref(), Some("voice-a"));
        assert_eq!(plan.row.default_video_url.as_deref(), Some("https://new.mp4"));
    }

    #[test]
    fn test_plan_counts_duplicates_without_id() {
        let mut anonymous = row("x", None, None);
        anonymous.id = None;
        let rows = vec![row("a", None, None), anonymous, row("c", None, None)];
        let plan = AssetWritePlan::new(&rows, "user-1", AssetKind::Audio, "v", Utc::now());

        assert_eq!(plan.duplicate_ids, vec!["c".to_string()]);
        assert_eq!(plan.unidentified_duplicates, 1);
    }

    #[test]
    fn test_plan_audio_preserves_video() {
        let rows = vec![row("a", Some("old-voice"), Some("https://keep.mp4"))];
        let plan = AssetWritePlan::new(&rows, "user-1", AssetKind::Audio, "new-voice", Utc::now());

        assert_eq!(plan.row.voice_id.as_deref(), Some("new-voice"));
        assert_eq!(plan.row.default_video_url.as_deref(), Some("https://keep.mp4"));
    }

    #[test]
    fn test_voice_prefix() {
        assert_eq!(voice_prefix("3f2a-9b7c-11ee-8c90"), "u3f2a9b7c");
        assert_eq!(voice_prefix("ab"), "uab");
        assert_eq!(voice_prefix("--"), "u");
    }

    #[test]
    fn test_row_id_accepts_numbers() {
        let row: UserDigitalAssets =
            serde_json::from_str(r#"{"id":42,"user_id":"u","voice_id":null}"#).unwrap();
        assert_eq!(row.id.as_deref(), Some("42"));
    }
}
