//! Pricing server - diamond price prediction service
//!
//! Serves interactive price estimates over HTTP, backed by the pre-fit
//! model artifacts in the configured models directory.

use anyhow::{Context, Result};
use pricer_lib::InferencePipeline;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting pricing-server");

    // Load configuration
    let config = config::ServerConfig::load()?;
    info!(models_dir = %config.models_dir.display(), "Server configured");

    // Build the serving pipeline over the configured model catalog
    let pipeline = InferencePipeline::new(config.serving_options())
        .context("Failed to build the inference pipeline")?;

    let available = pipeline.registry().list().len();
    info!(models_available = available, "Model registry initialized");

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(Arc::new(pipeline)));

    // Start the API server
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    api_handle.abort();

    Ok(())
}
