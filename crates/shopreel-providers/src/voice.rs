//! Voice aliases and TTS text preparation.

use std::sync::LazyLock;

use regex::Regex;

/// Branded voice names shown in the UI and the CosyVoice voice ids behind them.
const VOICE_ALIASES: &[(&str, &str)] = &[
    ("雅雅", "longxiaochun"),
    ("小娩", "longxiaowan"),
    ("白白", "longyebai"),
    ("严选男声", "longcheng"),
    ("老铁", "longlaotie"),
    ("龙飞", "longfei"),
];

/// Resolve a branded voice name; anything else is treated as a raw voice id.
pub fn resolve_voice_id(input: &str) -> &str {
    VOICE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == input)
        .map(|(_, id)| *id)
        .unwrap_or(input)
}

static PICTOGRAPHS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        "[",
        r"\x{1F600}-\x{1F64F}\x{1F300}-\x{1F5FF}\x{1F680}-\x{1F6FF}\x{1F1E6}-\x{1F1FF}",
        r"\x{2600}-\x{26FF}\x{2700}-\x{27BF}\x{1F900}-\x{1F9FF}\x{1F3FB}-\x{1F3FF}",
        r"\x{200D}\x{200B}\x{200E}\x{200F}\x{FE0F}\x{1F000}-\x{1F02B}\x{1F030}-\x{1F093}",
        "]"
    ))
    .unwrap()
});

static PAUSE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[停顿\d+(?:ms|s)\]").unwrap());
static SIGH_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(?:思考|叹气)\]").unwrap());
static REPEATED_QUESTION: LazyLock<Regex> = LazyLock::new(|| Regex::new("？{2,}").unwrap());
static REPEATED_BANG: LazyLock<Regex> = LazyLock::new(|| Regex::new("！{2,}").unwrap());
static REPEATED_STOP: LazyLock<Regex> = LazyLock::new(|| Regex::new("。{2,}").unwrap());
static REPEATED_ELLIPSIS: LazyLock<Regex> = LazyLock::new(|| Regex::new("…{3,}").unwrap());

/// Turn script text into something CosyVoice reads well.
///
/// Emoji and zero-width marks are dropped, emotion tags become punctuation
/// that shapes prosody, and runs of repeated punctuation are collapsed.
pub fn preprocess_tts_text(text: &str) -> String {
    let text = PICTOGRAPHS.replace_all(text, "");
    let text = PAUSE_TAG.replace_all(&text, "…… ");
    let text = text.replace("[吸气]", "，");
    let text = SIGH_TAG.replace_all(&text, " —— ");
    let text = text.replace("[重读]", "！").replace("[慢读]", "…… ");

    let text = REPEATED_QUESTION.replace_all(&text, "？");
    let text = REPEATED_BANG.replace_all(&text, "！");
    let text = REPEATED_STOP.replace_all(&text, "。");
    let text = REPEATED_ELLIPSIS.replace_all(&text, "……");

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_voice_id() {
        assert_eq!(resolve_voice_id("雅雅"), "longxiaochun");
        assert_eq!(resolve_voice_id("老铁"), "longlaotie");
        assert_eq!(resolve_voice_id("cosyvoice-v3-plus-u1234abcd-xyz"), "cosyvoice-v3-plus-u1234abcd-xyz");
    }

    #[test]
    fn test_strips_pictographs() {
        assert_eq!(preprocess_tts_text("🔥今天上新👍🏻啦✨"), "今天上新啦");
        assert_eq!(preprocess_tts_text("a\u{200B}b\u{FE0F}"), "ab");
    }

    #[test]
    fn test_emotion_tags() {
        assert_eq!(preprocess_tts_text("老板[停顿500ms]来了"), "老板…… 来了");
        assert_eq!(preprocess_tts_text("等等[停顿2s]"), "等等……");
        assert_eq!(preprocess_tts_text("[吸气]好"), "，好");
        assert_eq!(preprocess_tts_text("嗯[思考]行"), "嗯 —— 行");
        assert_eq!(preprocess_tts_text("真的[重读]"), "真的！");
    }

    #[test]
    fn test_collapses_repeated_punctuation() {
        assert_eq!(preprocess_tts_text("真的吗？？？太好了！！！"), "真的吗？太好了！");
        assert_eq!(preprocess_tts_text("好。。。"), "好。");
        assert_eq!(preprocess_tts_text("然后…………"), "然后……");
        assert_eq!(preprocess_tts_text("然后……"), "然后……");
    }

    #[test]
    fn test_trims() {
        assert_eq!(preprocess_tts_text("  欢迎光临 \n"), "欢迎光临");
    }
}
