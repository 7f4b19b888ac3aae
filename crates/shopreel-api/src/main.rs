//! ShopReel API server.

use std::net::SocketAddr;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shopreel_api::{create_router, metrics, ApiConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // rustls 0.23 needs a process-wide provider before any TLS client is built.
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("rustls crypto provider already installed"))?;

    init_tracing()?;

    let config = ApiConfig::from_env();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        "Starting shopreel-api"
    );

    let state = AppState::from_env(config.clone()).context("building application state")?;
    let app = create_router(state, prometheus()?);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("HOST/PORT do not form a socket address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("serving HTTP")?;

    info!("Stopped");
    Ok(())
}

/// Human-readable logs by default, one JSON object per line with `LOG_FORMAT=json`.
fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("shopreel=info".parse()?);
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_current_span(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
    Ok(())
}

/// Install the Prometheus recorder unless `METRICS_ENABLED` is false.
fn prometheus() -> anyhow::Result<Option<PrometheusHandle>> {
    let enabled = std::env::var("METRICS_ENABLED")
        .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "false" | "0" | "off"))
        .unwrap_or(true);
    if !enabled {
        return Ok(None);
    }
    let handle = metrics::init_metrics().context("installing metrics recorder")?;
    info!("Prometheus metrics served at /metrics");
    Ok(Some(handle))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining connections"),
        Err(e) => {
            error!(error = %e, "Cannot listen for ctrl-c; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
