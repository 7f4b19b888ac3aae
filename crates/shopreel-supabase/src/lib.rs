//! Supabase PostgREST client.
//!
//! This crate provides:
//! - [`SupabaseClient`] with retry, tracing spans and metrics
//! - [`Query`] for `eq` / `in` filters, ordering and limits
//! - Typed repositories for profiles, redeem codes, digital assets,
//!   license keys and projects

pub mod assets;
pub mod client;
pub mod error;
pub mod licenses;
pub mod metrics;
pub mod profiles;
pub mod projects;
pub mod query;
pub mod redeem;
pub mod retry;

pub use assets::DigitalAssetRepository;
pub use client::{SupabaseClient, SupabaseConfig};
pub use error::{SupabaseError, SupabaseResult};
pub use licenses::LicenseKeyRepository;
pub use profiles::ProfileRepository;
pub use projects::ProjectRepository;
pub use query::Query;
pub use redeem::RedeemCodeRepository;
pub use retry::RetryConfig;
