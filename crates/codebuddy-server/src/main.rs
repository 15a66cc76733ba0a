//! Collaborative coding server.
//!
//! Run with: cargo run -p codebuddy-server -- --bind 127.0.0.1:8080
//!
//! Code channel: `ws://<addr>/ws/code/{sessionId}`
//! Chat channel: `ws://<addr>/ws/chat/{sessionId}`
//! Sessions:     `http://<addr>/api/sessions`

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use codebuddy_session::storage::MemoryStorage;
use codebuddy_transport::{AppState, create_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .init();

    let state = AppState::new(Arc::new(MemoryStorage::new()));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!("Server listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
