//! Object key layout.

use chrono::{DateTime, Utc};

use crate::error::{StorageError, StorageResult};

/// Broad media class of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
        }
    }

    /// Classify by lowercase file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "mp4" | "mov" | "webm" | "m4v" => Some(MediaKind::Video),
            "mp3" | "wav" | "m4a" | "aac" | "ogg" => Some(MediaKind::Audio),
            "jpg" | "jpeg" | "png" | "webp" => Some(MediaKind::Image),
            _ => None,
        }
    }
}

/// Key for synthesized speech: `gen_audio/{yyyymmdd}/{millis}_{uuid}.mp3`.
pub fn generated_audio_key(now: DateTime<Utc>) -> String {
    format!(
        "gen_audio/{}/{}_{}.mp3",
        now.format("%Y%m%d"),
        now.timestamp_millis(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Key for a user upload: `uploads/{owner}/{kind}/{uuid}.{ext}`.
///
/// The original filename only contributes its extension.
pub fn upload_key(owner: &str, filename: &str) -> StorageResult<(String, MediaKind)> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or_else(|| StorageError::invalid_key(format!("{filename}: missing extension")))?;
    let kind = MediaKind::from_extension(&ext)
        .ok_or_else(|| StorageError::invalid_key(format!("{filename}: unsupported file type")))?;

    let owner: String = owner
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if owner.is_empty() {
        return Err(StorageError::invalid_key("empty owner"));
    }

    let key = format!(
        "uploads/{owner}/{}/{}.{ext}",
        kind.as_str(),
        uuid::Uuid::new_v4().simple()
    );
    Ok((key, kind))
}

/// MIME type for a key, by extension.
pub fn content_type_for(key: &str) -> &'static str {
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "ogg" => "audio/ogg",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generated_audio_key() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
        let key = generated_audio_key(now);
        assert!(key.starts_with("gen_audio/20250310/1741593600000_"));
        assert!(key.ends_with(".mp3"));
        assert_eq!(content_type_for(&key), "audio/mpeg");
    }

    #[test]
    fn test_upload_key() {
        let (key, kind) = upload_key("3f2a-9b7c", "我的视频.MP4").unwrap();
        assert_eq!(kind, MediaKind::Video);
        assert!(key.starts_with("uploads/3f2a-9b7c/video/"));
        assert!(key.ends_with(".mp4"));
    }

    #[test]
    fn test_upload_key_sanitizes_owner() {
        let (key, _) = upload_key("../../etc", "a.png").unwrap();
        assert!(key.starts_with("uploads/etc/image/"));
        assert!(upload_key("..", "a.png").is_err());
    }

    #[test]
    fn test_upload_key_rejects_unknown_types() {
        assert!(upload_key("u1", "payload.exe").is_err());
        assert!(upload_key("u1", "noextension").is_err());
    }
}
