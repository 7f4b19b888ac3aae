//! API routes.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    check_task, create_project, delete_project, generate, generate_digital_video,
    get_digital_assets, get_profile, get_project, health, job_events, list_projects,
    parse_video, ready, redeem, sora_generate, sora_status, update_digital_assets,
    update_project, upload_media,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let generation_routes = Router::new()
        .route("/generate", post(generate))
        .route("/parse-video", post(parse_video))
        .route("/generate-digital-video", post(generate_digital_video))
        .route("/sora-generate", get(sora_status).post(sora_generate))
        .route("/check-task", get(check_task));

    // Long-lived SSE streams; rate limited on connect only.
    let job_routes = Router::new().route("/jobs/:provider/:task_id/events", get(job_events));

    let account_routes = Router::new()
        .route("/redeem", post(redeem))
        .route("/profile", get(get_profile))
        .route(
            "/digital-assets",
            get(get_digital_assets).post(update_digital_assets),
        )
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/:id",
            get(get_project).patch(update_project).delete(delete_project),
        );

    let json_routes = Router::new()
        .merge(generation_routes)
        .merge(job_routes)
        .merge(account_routes)
        // SECURITY: Request body size limit to prevent DoS attacks
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size));

    let upload_routes = Router::new()
        .route("/uploads", post(upload_media))
        .layer(DefaultBodyLimit::max(state.config.max_upload_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_upload_size));

    let rate_limiter = Arc::new(RateLimiterCache::new(
        state.config.rate_limit_rps,
        state.config.rate_limit_burst,
    ));

    let api_routes = Router::new()
        .merge(json_routes)
        .merge(upload_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
