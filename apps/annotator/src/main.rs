mod augment;
mod codec;
mod config;
mod errors;
mod evaluation;
mod llm_client;
mod models;
mod output_formats;
mod prompt;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::output_formats::InMemoryOutputFormatStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting annotator v{}", env!("CARGO_PKG_VERSION"));

    let llm = LlmClient::new(&config).context("Failed to build LLM client")?;
    info!(
        "LLM client initialized (deepseek: {}, gemini: {}, retries: {})",
        key_status(&config.deepseek_api_key),
        key_status(&config.gemini_api_key),
        config.llm_max_retries
    );

    let state = AppState::new(Arc::new(llm), Arc::new(InMemoryOutputFormatStore::new()));

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn key_status(key: &str) -> &'static str {
    if key.is_empty() {
        "not configured"
    } else {
        "configured"
    }
}
