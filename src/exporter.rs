//! One polling cycle, end to end.
//!
//! Load config, read the previous measurement, poll the plugs, sanitize,
//! insert into the warehouse, replace the stored state. Any failure past
//! config load that would leave downstream consumers with bad data is an
//! error; the caller logs it and exits non-zero.

use crate::config::{MeteringConfig, Settings};
use crate::state::StateClient;
use crate::tplink::{PlugClient, PlugClientConfig};
use crate::warehouse::WarehouseClient;
use anyhow::{Context, Result};
use tracing::info;

pub struct ExporterService {
    settings: Settings,
    plug_client: PlugClient,
    state_client: StateClient,
    warehouse_client: WarehouseClient,
}

impl ExporterService {
    pub fn new(settings: Settings) -> Self {
        let plug_client = PlugClient::new(PlugClientConfig::new(settings.timeout_seconds));
        let state_client = StateClient::new(&settings.state_file_path);
        let warehouse_client = WarehouseClient::new(
            settings.warehouse_url.clone(),
            settings.warehouse_enable,
        );

        Self {
            settings,
            plug_client,
            state_client,
            warehouse_client,
        }
    }

    /// Runs a single cycle and returns the number of samples stored.
    pub async fn run(&self) -> Result<usize> {
        let config = MeteringConfig::load(&self.settings.config_path)
            .await
            .context("Failed loading metering config")?;
        info!(
            "Loaded metering config from {} (location: {})",
            self.settings.config_path, config.location
        );

        let last_measurement = self.state_client.read_state().await;

        let measurement = self
            .plug_client
            .get_measurement(&config, last_measurement.as_ref())
            .await;

        self.warehouse_client
            .insert_measurement(&measurement)
            .await
            .context("Failed inserting measurement into warehouse")?;

        self.state_client
            .store_state(&measurement)
            .await
            .context("Failed storing measurement state")?;

        Ok(measurement.samples.len())
    }
}
