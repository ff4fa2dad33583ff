use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use garage_console::config::ConsoleConfig;
use garage_console::router::build_router;
use garage_console::state::AppState;
use garage_core::config::Config;
use garage_core::tracing::init_tracing;

/// How often idle browser sessions are swept.
const SWEEP_EVERY: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(env!("CARGO_PKG_NAME"));

    let config = ConsoleConfig::from_env().context("failed to load console config")?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("failed to build HTTP client")?;

    let state = AppState::from_config(&config, client);
    let max_idle = Duration::from_secs(config.session_idle_secs);
    let sweep = tokio::spawn(Arc::clone(&state.sessions).sweep_idle(max_idle, SWEEP_EVERY));

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.console_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("console listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweep.abort();
    info!("console stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
