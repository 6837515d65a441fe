//! Last-measurement state store.
//!
//! The sanitizer needs the previous cycle's measurement as its baseline. It
//! lives as a JSON file at a configurable path: read at cycle start, replaced
//! at cycle end. A missing or corrupt file only costs one cycle of
//! sanitization, so reads never fail the run; writes must succeed or the
//! next cycle would sanitize against a stale baseline.

use crate::models::Measurement;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

pub struct StateClient {
    state_file_path: PathBuf,
}

impl StateClient {
    pub fn new<P: AsRef<Path>>(state_file_path: P) -> Self {
        Self {
            state_file_path: state_file_path.as_ref().to_path_buf(),
        }
    }

    /// Reads the previous measurement. `None` when the file is absent,
    /// unreadable or does not parse; state trouble degrades sanitization,
    /// it does not abort the cycle.
    pub async fn read_state(&self) -> Option<Measurement> {
        let contents = match fs::read_to_string(&self.state_file_path).await {
            Ok(contents) => contents,
            Err(e) => {
                info!(
                    "No previous measurement at {:?} ({}), starting without prior state",
                    self.state_file_path, e
                );
                return None;
            }
        };

        match serde_json::from_str::<Measurement>(&contents) {
            Ok(measurement) => {
                info!(
                    "Read previous measurement {} from {:?}",
                    measurement.id, self.state_file_path
                );
                Some(measurement)
            }
            Err(e) => {
                warn!(
                    "Corrupt state file {:?} ({}), starting without prior state",
                    self.state_file_path, e
                );
                None
            }
        }
    }

    /// Replaces the stored measurement with this cycle's result.
    pub async fn store_state(&self, measurement: &Measurement) -> Result<()> {
        if let Some(parent) = self.state_file_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed creating state dir {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(measurement)
            .context("Failed serializing measurement state")?;
        fs::write(&self.state_file_path, json)
            .await
            .with_context(|| format!("Failed writing state file {:?}", self.state_file_path))?;

        info!(
            "Stored measurement {} in {:?}",
            measurement.id, self.state_file_path
        );
        Ok(())
    }
}
