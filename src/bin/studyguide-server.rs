//! HTTP server binary for edgequake-studyguide.
//!
//! Reads the listen address from `STUDYGUIDE_HOST` / `STUDYGUIDE_PORT` and
//! the model configuration from the usual provider variables.

use anyhow::{Context, Result};
use edgequake_studyguide::server::{self, AppState, ServerConfig};
use edgequake_studyguide::{resolve_backend, GenerationConfig, PdfEngine};
use std::io;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,edgequake_studyguide=info,tower_http=info")
            }),
        )
        .with_writer(io::stderr)
        .init();

    let server_config = ServerConfig::from_env();

    let mut builder = GenerationConfig::builder();
    if let Ok(model) = std::env::var("EDGEQUAKE_MODEL") {
        if !model.trim().is_empty() {
            builder = builder.model(model);
        }
    }
    let config = builder.build().context("Invalid configuration")?;

    // A missing credential is reported per request as a configuration
    // error; say so once at startup as well.
    if let Err(e) = resolve_backend(&config) {
        tracing::warn!("LLM backend not available yet: {}", e);
    }

    let engine = Arc::new(PdfEngine::new());
    let app = server::app(AppState::new(config, engine));

    let addr = server_config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Study guide server listening on {addr}");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
