//! DCIM Server — application entry point.
//!
//! Connects to SurrealDB, runs pending schema migrations and waits for
//! shutdown. The HTTP routing layer consuming the repositories is an
//! external collaborator and is wired in at deployment.

use anyhow::Context;
use dcim_db::{DbConfig, DbManager, run_migrations};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dcim=info".parse()?))
        .json()
        .init();

    tracing::info!("Starting DCIM server...");

    let config = DbConfig::from_env();
    let manager = DbManager::connect(&config)
        .await
        .context("failed to connect to SurrealDB")?;

    run_migrations(manager.client())
        .await
        .context("failed to run migrations")?;

    tracing::info!("DCIM server ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!("DCIM server stopped.");
    Ok(())
}
