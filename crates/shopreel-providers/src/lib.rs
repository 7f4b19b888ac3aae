//! Clients for the third-party services behind ShopReel.
//!
//! - [`DashScopeClient`]: CosyVoice TTS, VideoRetalk lip-sync, voice cloning
//! - [`ApiMartClient`]: Sora image-to-video
//! - [`LlmClient`]: OpenAI-compatible chat completions, plus [`PromptDirector`]
//! - [`ApiHzClient`]: short-video share-link resolution
//! - [`SiliconFlowClient`]: speech-to-text
//!
//! The two video providers implement [`shopreel_poller::JobStatusSource`].

pub mod apihz;
pub mod apimart;
pub mod dashscope;
pub mod director;
pub mod error;
pub mod http;
pub mod llm;
pub mod metrics;
pub mod siliconflow;
pub mod voice;

pub use apihz::{extract_share_url, ApiHzClient, ApiHzConfig};
pub use apimart::{ApiMartClient, ApiMartConfig, SoraSubmission};
pub use dashscope::{DashScopeClient, DashScopeConfig, DEFAULT_TTS_MODEL};
pub use director::PromptDirector;
pub use error::{ProviderError, ProviderResult};
pub use llm::{ChatMessage, LlmClient, LlmConfig, TextStream};
pub use siliconflow::{SiliconFlowClient, SiliconFlowConfig};
pub use voice::{preprocess_tts_text, resolve_voice_id};
