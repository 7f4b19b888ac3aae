//! Sora prompt rewriting ("director mode").

use shopreel_models::SoraShotType;
use tracing::{info, warn};

use crate::llm::{ChatMessage, LlmClient, LlmConfig};

const STORE_DIRECTOR: &str = "You are a viral TikTok videographer using Sora-2.
Convert the user's raw description into a professional video prompt.
Structure:
(Visual Description): [First-person view entering the shop, smooth gimbal movement, 4k detail]
(Atmosphere): [Bustling with customers, steam rising, warm lighting, lively ambient noise]
(Action): [Specific interactions if mentioned]
OUTPUT: A single paragraph of English prompt optimized for Sora.";

const PRODUCT_DIRECTOR: &str = "You are a high-end commercial director using Sora-2.
Convert the user's raw description into a luxury product advertisement prompt.
Structure:
(Visual Description): [Macro close-up, sharp focus on texture, clean luxury background]
(Lighting): [Professional studio softbox lighting, dynamic reflections]
(Movement): [Slow-motion 360-degree orbit or elegant panning]
OUTPUT: A single paragraph of English prompt optimized for Sora.";

/// System prompt for a shot type.
pub fn director_prompt(shot: SoraShotType) -> &'static str {
    match shot {
        SoraShotType::Store => STORE_DIRECTOR,
        SoraShotType::Product => PRODUCT_DIRECTOR,
    }
}

/// Rewrites raw user descriptions into Sora prompts.
///
/// Without a configured model, or when the model call fails, the raw prompt
/// is used unchanged.
#[derive(Clone, Default)]
pub struct PromptDirector {
    llm: Option<LlmClient>,
}

impl PromptDirector {
    pub fn new(llm: Option<LlmClient>) -> Self {
        Self { llm }
    }

    pub fn from_env() -> Self {
        let llm = LlmConfig::director_from_env().and_then(|config| match LlmClient::new(config) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "Prompt director disabled");
                None
            }
        });
        if llm.is_none() {
            warn!("DEEPSEEK_API_KEY not set; Sora prompts are sent unchanged");
        }
        Self::new(llm)
    }

    pub fn is_enabled(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn rewrite(&self, prompt: &str, shot: SoraShotType) -> String {
        let Some(llm) = &self.llm else {
            return prompt.to_string();
        };

        let messages = [
            ChatMessage::system(director_prompt(shot)),
            ChatMessage::user(format!("User Input: {prompt}")),
        ];
        match llm.complete(&messages).await {
            Ok(rewritten) => {
                info!(chars = rewritten.chars().count(), "Sora prompt rewritten");
                rewritten.trim().to_string()
            }
            Err(e) => {
                warn!(error = %e, "Prompt rewrite failed, using raw prompt");
                prompt.to_string()
            }
        }
    }
}
