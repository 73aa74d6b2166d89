mod api;
mod config;
mod dto;
mod error;
mod state;

use crate::{config::Config, state::AppState};
use anyhow::Context;
use clap::Parser;
use std::{sync::Arc, time::Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    info!("Starting server...");
    let now = Instant::now();
    let port = config.port;
    let state = tokio::task::spawn_blocking(move || AppState::load(&config))
        .await
        .context("loading task panicked")??;
    info!(
        "Server ready in {:?}, model trained: {}",
        now.elapsed(),
        state.service.is_trained()
    );

    let app = api::router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .with_context(|| format!("binding port {port}"))?;
    info!("Listening to port {port}");
    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}
