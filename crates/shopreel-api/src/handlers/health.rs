//! Liveness and readiness probes.

use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// `GET /health`: the process is up.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub supabase: Dependency,
    pub storage: Dependency,
}

/// Result of probing one backing service.
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Dependency {
    Ok { latency_ms: u64 },
    Error { error: String },
    NotConfigured,
}

impl Dependency {
    async fn probe<E: Display>(check: impl Future<Output = Result<(), E>>) -> Self {
        let start = Instant::now();
        match check.await {
            Ok(()) => Dependency::Ok {
                latency_ms: start.elapsed().as_millis() as u64,
            },
            Err(e) => Dependency::Error {
                error: e.to_string(),
            },
        }
    }

    fn is_down(&self) -> bool {
        matches!(self, Dependency::Error { .. })
    }
}

/// `GET /ready`: Supabase answers, and OSS too when it is configured.
pub async fn ready(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let supabase = Dependency::probe(state.supabase.ping()).await;
    let storage = match &state.providers.storage {
        Some(oss) => Dependency::probe(oss.check_connectivity()).await,
        None => Dependency::NotConfigured,
    };

    let (code, status) = if supabase.is_down() || storage.is_down() {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    } else {
        (StatusCode::OK, "ready")
    };
    (
        code,
        Json(ReadinessResponse {
            status,
            supabase,
            storage,
        }),
    )
}
