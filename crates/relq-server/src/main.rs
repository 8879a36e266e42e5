//! relq server
//!
//! Restricted SQL translation over HTTP: loads the allowlist once from
//! configuration, then serves the grammar and search front-ends.

use std::sync::Arc;

use tracing::info;

mod api;
mod config;
mod logging;

use api::AppState;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path =
        std::env::var("RELQ_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("could not load {config_path}: {err}; using defaults");
            Config::default()
        }
    };
    config.apply_logging_env();
    logging::init();

    if config.allowlist.is_empty() {
        tracing::warn!("allowlist is empty; every query will be rejected");
    } else {
        info!(tables = config.allowlist.len(), "allowlist loaded");
    }

    let state = Arc::new(AppState {
        allowlist: config.allowlist.clone(),
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("starting relq server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, api::router(state)).await?;

    Ok(())
}
