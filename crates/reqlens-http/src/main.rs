//! reqlens demo server.
//!
//! - Demo routes with known latency: /500ms, /1s, /2s, /dynamic_delay?delay=ms
//! - Ops: /healthz, /readyz, /metrics, /metrics/json
//! - Config path: first CLI argument, default `reqlens.yaml`

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use reqlens_core::error::{ReqLensError, Result};
use reqlens_http::{app_state, config, router, sweeper};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(code = e.code().as_str(), error = %e, "reqlens-http failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "reqlens.yaml".to_string());
    let cfg = config::load_from_file(&path)?;

    // Schema conflicts surface here; nothing is served in that case.
    let state = app_state::AppState::new(cfg)?;
    let server = &state.cfg().server;
    let listen: SocketAddr = server.listen.parse().map_err(|e| {
        ReqLensError::InvalidConfig(format!("server.listen must be a valid SocketAddr: {e}"))
    })?;
    let sweeper = sweeper::spawn_timer_sweeper(
        state.instrumentation(),
        server.sweep_interval(),
        server.timer_ttl(),
    );
    let app = router::build_router(state.clone());

    tracing::info!(%listen, "reqlens-http starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| ReqLensError::Internal(format!("failed to bind {listen}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| ReqLensError::Internal(format!("server failed: {e}")))?;

    sweeper.abort();
    tracing::info!("reqlens-http stopped");
    Ok(())
}

async fn shutdown_signal(state: app_state::AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    state.set_draining();
    tracing::info!(in_flight = state.instrumentation().in_flight(), "draining");
}
