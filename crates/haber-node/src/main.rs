//! # Haber Node
//!
//! Runs a Haber diamond: deploys it on first start (or restores it from its
//! snapshot) and serves it until interrupted.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialize logging
//! 3. Restore or deploy the diamond
//! 4. Signal ready and wait for Ctrl+C

use anyhow::{Context, Result};
use haber_node::{load_config, HaberNode};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config().context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .context("Invalid log filter")?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("===========================================");
    info!("  Haber Diamond Node v{}", haber_diamond::VERSION);
    info!("===========================================");

    let node = HaberNode::start(config).await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    node.shutdown().await;
    Ok(())
}
