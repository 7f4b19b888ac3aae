//! Axum HTTP API server.
//!
//! This crate provides:
//! - Script generation (JSON, two-step ideas/script, streamed Markdown)
//! - Digital-human and Sora video submission with status passthrough
//! - Server-Sent-Events job tracking backed by the shared poller
//! - Membership redeem, quota gating and shop-profile CRUD
//! - Supabase JWT verification, rate limiting and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
