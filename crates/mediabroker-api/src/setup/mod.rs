//! Application setup and initialization
//!
//! All initialization logic lives here rather than in main.rs: telemetry,
//! database pool + migrations, object store clients, service wiring, routes.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use mediabroker_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration before opening any connections.
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(&config.environment);

    tracing::info!(
        environment = %config.environment,
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let object_store = storage::setup_storage(&config).await?;
    let state = services::initialize_services(&config, pool, object_store)?;
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
