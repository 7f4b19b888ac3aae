//! Shared data models for the ShopReel backend.
//!
//! This crate provides Serde-serializable types for:
//! - Remote async jobs (digital-human and Sora video generation)
//! - Membership, quota and redeem codes
//! - Marketing scripts and shop profiles
//! - Per-user digital assets (cloned voice, base video)
//! - Request bodies for the HTTP API

pub mod assets;
pub mod job;
pub mod membership;
pub mod requests;
pub mod script;
pub mod video;

pub use assets::{voice_prefix, AssetKind, AssetWritePlan, UserDigitalAssets};
pub use job::{AsyncJob, JobId, JobProvider, JobState, StatusReport};
pub use membership::{
    LicenseKey, MembershipLevel, QuotaDecision, RedeemCode, UserProfile, DAILY_LIMIT_FREE,
    DEFAULT_REDEEM_DAYS, DEVICE_FREE_LIMIT,
};
pub use requests::{
    AssetUpdateRequest, DigitalVideoRequest, DirectScriptRequest, GenerateRequest,
    HookScriptRequest, IdeasRequest, ParseVideoRequest, ProjectPatch, RedeemRequest,
    RequestError, RewriteRequest, SoraGenerateRequest, TranscribeRequest,
};
pub use script::{
    extract_json_block, AmmoBox, ConversionGoal, IdeasResult, ScriptParseError, ScriptResult,
    ScriptSegment, ScriptType, ShopProfile,
};
pub use video::{AspectRatio, SoraModel, SoraShotType, DEFAULT_SORA_DURATION_SECS};
