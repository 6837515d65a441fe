//! HS110 Energy Exporter - polls TP-Link HS110 smart plugs for their energy
//! counters and ships one measurement batch per run downstream.
//!
//! One invocation is one polling cycle:
//! - UDP broadcast discovery of plugs on the local subnet
//! - concurrent ciphered TCP status queries against every plug found
//! - spike sanitization against the previous cycle's stored measurement
//! - warehouse insert + state file replacement
//!
//! Exit code 0 after a stored cycle, non-zero after a logged failure.

mod config;
mod exporter;
mod models;
mod sanitize;
mod state;
mod tplink;
mod warehouse;

use anyhow::{Context, Result};
use config::Settings;
use exporter::ExporterService;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let settings = Settings::from_env().context("Failed reading settings from environment")?;
    info!(
        "HS110 exporter starting (timeout: {}s, config: {})",
        settings.timeout_seconds, settings.config_path
    );

    let service = ExporterService::new(settings);
    let stored_samples = service.run().await?;

    info!("Stored {} samples, exiting...", stored_samples);
    Ok(())
}
