//! Configuration for one exporter run.
//!
//! Two sources, loaded once at startup:
//! - the metering config: a YAML file describing how plug readings map to
//!   samples (location, entity, sample/metric type, value multiplier)
//! - process settings from environment variables (timeout, file paths,
//!   warehouse endpoint and toggle)

use crate::models::{EntityType, MetricType, SampleType};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Metering config loaded from YAML. Shared verbatim with the samples the
/// exporter emits, except `sample_name` which comes from each plug's alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeteringConfig {
    pub location: String,
    pub entity_type: EntityType,
    pub entity_name: String,
    pub sample_type: SampleType,
    pub metric_type: MetricType,
    pub value_multiplier: f64,
}

impl MeteringConfig {
    pub async fn load(path: &str) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed reading metering config from {}", path))?;
        let config: MeteringConfig = serde_yaml::from_str(&txt)
            .with_context(|| format!("Invalid metering config in {}", path))?;
        Ok(config)
    }
}

/// Process settings from the environment, with the same defaults the exporter
/// has always shipped with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub timeout_seconds: u64,
    pub config_path: String,
    pub state_file_path: String,
    pub warehouse_url: Option<String>,
    pub warehouse_enable: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let timeout_seconds: u64 = std::env::var("TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("TIMEOUT_SECONDS must be an integer")?;

        let config_path = std::env::var("METERING_CONFIG_PATH")
            .unwrap_or_else(|_| "/configs/config.yaml".to_string());

        let state_file_path = std::env::var("STATE_FILE_PATH")
            .unwrap_or_else(|_| "/configs/last-measurement.json".to_string());

        let warehouse_url = std::env::var("WAREHOUSE_URL").ok();

        let warehouse_enable: bool = std::env::var("WAREHOUSE_ENABLE")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(Self {
            timeout_seconds,
            config_path,
            state_file_path,
            warehouse_url,
            warehouse_enable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn load_parses_yaml_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "location: My Home\n\
             entityType: ENTITY_TYPE_DEVICE\n\
             entityName: TP-Link HS110\n\
             sampleType: SAMPLE_TYPE_ELECTRICITY_CONSUMPTION\n\
             metricType: METRIC_TYPE_COUNTER\n\
             valueMultiplier: 3600"
        )
        .unwrap();

        let config = MeteringConfig::load(file.path().to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(config.location, "My Home");
        assert_eq!(config.entity_type, EntityType::Device);
        assert_eq!(config.entity_name, "TP-Link HS110");
        assert_eq!(config.sample_type, SampleType::ElectricityConsumption);
        assert_eq!(config.metric_type, MetricType::Counter);
        assert_eq!(config.value_multiplier, 3600.0);
    }

    #[tokio::test]
    async fn load_fails_on_missing_file() {
        assert!(MeteringConfig::load("/nonexistent/config.yaml").await.is_err());
    }
}
