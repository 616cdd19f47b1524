//! Main entry point for the Ninu factory control backend.
//!
//! This file initializes logging and configuration, sets up the database,
//! and serves the Axum router with the authorization pipeline applied.

mod api;
mod app;
mod auth;
mod config;
mod database;
mod errors;
mod repositories;
mod services;
mod utils;

use crate::app::{AppState, app_router};
use crate::services::rate_limiter::{InMemoryRateLimitStore, RateLimiter};
use crate::services::user_service::UserService;
use anyhow::Context;
use config::Config;
use database::Database;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let db = Database::new(&config).await?;
    db.migrate().await?;

    if let Some(admin) = &config.bootstrap_admin {
        let created = UserService::new(db.pool(), config.bcrypt_cost)
            .ensure_bootstrap_admin(admin)
            .await
            .context("failed to create bootstrap administrator")?;
        if created {
            info!(username = %admin.username, "Bootstrap administrator created");
        }
    }

    let server_port = config.server_port;
    let state = AppState::new(
        config,
        db.pool().clone(),
        Arc::new(InMemoryRateLimitStore::new()),
    )
    .await?;

    spawn_rate_limit_sweeper(state.rate_limiter.clone());

    let app = app_router(state);

    let bind_address = format!("0.0.0.0:{}", server_port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;

    info!("Starting Ninu control server on port {}", server_port);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    db.close().await;
    Ok(())
}

/// Drops expired rate limit windows once per window length.
fn spawn_rate_limit_sweeper(limiter: Arc<RateLimiter>) {
    let period = limiter
        .window()
        .to_std()
        .unwrap_or(Duration::from_secs(60))
        .max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match limiter.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "Purged expired rate limit windows"),
                Err(e) => warn!("Rate limit sweep failed: {}", e),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
