//! JSON wire structs for the plug protocol.
//!
//! Discovery and status queries send the same empty-bodied command; the plug
//! answers with its sysinfo block and realtime energy counters. Responses in
//! the field vary in which blocks they carry, so everything inbound is
//! optional.

use serde::{Deserialize, Serialize};

/// The combined sysinfo + realtime request. Field order matters: the
/// firmware's known ciphertext corresponds to `system` first, `emeter`
/// second, and serde_json serializes in declaration order.
#[derive(Debug, Default, Serialize)]
pub struct DeviceInfoRequest {
    pub system: SystemRequest,
    pub emeter: EMeterRequest,
}

#[derive(Debug, Default, Serialize)]
pub struct SystemRequest {
    pub get_sysinfo: Empty,
}

#[derive(Debug, Default, Serialize)]
pub struct EMeterRequest {
    pub get_realtime: Empty,
}

#[derive(Debug, Default, Serialize)]
pub struct Empty {}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceInfoResponse {
    pub system: Option<SystemResponse>,
    pub emeter: Option<EMeterResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemResponse {
    pub get_sysinfo: SystemInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EMeterResponse {
    pub get_realtime: RealtimeEnergy,
}

/// The subset of sysinfo the exporter uses; plugs report many more fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemInfo {
    pub alias: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub relay_state: u8,
    #[serde(default)]
    pub err_code: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RealtimeEnergy {
    #[serde(default)]
    pub err_code: i32,
    /// Instantaneous power draw in milliwatts.
    #[serde(default)]
    pub power_mw: f64,
    #[serde(default)]
    pub voltage_mv: f64,
    #[serde(default)]
    pub current_ma: f64,
    /// Cumulative consumption counter in watt-hours. Monotonically
    /// non-decreasing unless the plug resets.
    #[serde(default)]
    pub total_wh: f64,
}

impl DeviceInfoResponse {
    pub fn alias(&self) -> Option<&str> {
        self.system.as_ref().map(|s| s.get_sysinfo.alias.as_str())
    }

    pub fn realtime(&self) -> Option<&RealtimeEnergy> {
        self.emeter.as_ref().map(|e| &e.get_realtime)
    }
}
