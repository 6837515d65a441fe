//! Downstream warehouse client.
//!
//! Ships one row per measurement, samples nested, to the analytical store's
//! HTTP insert endpoint. The store partitions on the measurement timestamp;
//! this side only guarantees the row shape and that a failed insert fails
//! the cycle. Can be disabled entirely for dry runs.

use crate::models::Measurement;
use anyhow::{Context, Result};
use tracing::{info, warn};

pub struct WarehouseClient {
    http: reqwest::Client,
    insert_url: Option<String>,
    enable: bool,
}

impl WarehouseClient {
    pub fn new(insert_url: Option<String>, enable: bool) -> Self {
        Self {
            http: reqwest::Client::new(),
            insert_url,
            enable,
        }
    }

    /// Inserts the measurement as one JSON row. Disabled or unconfigured
    /// clients log and skip; a configured insert that fails is an error.
    pub async fn insert_measurement(&self, measurement: &Measurement) -> Result<()> {
        if !self.enable {
            warn!("Warehouse insert disabled, skipping measurement {}", measurement.id);
            return Ok(());
        }
        let Some(url) = &self.insert_url else {
            warn!("No warehouse endpoint configured, skipping measurement {}", measurement.id);
            return Ok(());
        };

        let response = self
            .http
            .post(url)
            .json(measurement)
            .send()
            .await
            .with_context(|| format!("Failed posting measurement to {}", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Warehouse insert returned {} for measurement {}", status, measurement.id);
        }

        info!(
            "Inserted measurement {} with {} samples into warehouse",
            measurement.id,
            measurement.samples.len()
        );
        Ok(())
    }
}
