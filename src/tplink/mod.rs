//! Client for TP-Link HS110 metering plugs.
//!
//! This module handles:
//! - UDP broadcast discovery of plugs on the local subnet
//! - Ciphered, length-framed TCP status queries per plug
//! - Concurrent fan-out of status queries over the discovered set
//! - Building one Measurement per polling cycle from the plug readings

pub mod cipher;
pub mod framing;
pub mod protocol;

use crate::config::MeteringConfig;
use crate::models::{Measurement, MetricType, Sample};
use crate::sanitize::sanitize_samples;
use chrono::Utc;
use futures::future::join_all;
use protocol::{DeviceInfoRequest, DeviceInfoResponse};
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Label stamped on every measurement this exporter produces.
pub const SOURCE: &str = "hs110-exporter";

/// Port the plugs listen on, for both UDP discovery and TCP control.
pub const DEVICE_PORT: u16 = 9999;

/// Local UDP port discovery replies are received on.
const DISCOVERY_BIND_PORT: u16 = 8755;

/// Datagram read buffer; plug replies stay well under this.
const READ_BUFFER_SIZE: usize = 2048;

/// Depth of the queue between the socket drain task and the discovery loop.
/// Bounds how far a reply flood can run ahead of the consumer.
const DISCOVERY_QUEUE_DEPTH: usize = 64;

/// Errors talking to plugs.
#[derive(Debug, thiserror::Error)]
pub enum PlugError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("timed out waiting for {0}")]
    Timeout(SocketAddr),
    #[error("malformed response from {addr}: {source}")]
    Protocol {
        addr: SocketAddr,
        source: serde_json::Error,
    },
    #[error("request serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One discovered plug. Session-scoped: built from a discovery reply,
/// enriched once with a live status, dropped at end of cycle.
#[derive(Debug, Clone)]
pub struct Device {
    /// Source address of the discovery reply. Plugs answer from their
    /// control port, so this is also where the TCP query goes.
    pub addr: SocketAddr,
    /// Decrypted discovery payload as received.
    pub raw: Vec<u8>,
    /// Parsed discovery payload.
    pub info: DeviceInfoResponse,
    /// Live status attached by the query engine.
    pub status: Option<DeviceInfoResponse>,
}

#[derive(Debug, Clone)]
pub struct PlugClientConfig {
    /// Per-operation timeout: the discovery window, and each connect/read/
    /// write on the TCP leg.
    pub timeout: Duration,
    /// Local bind address for the discovery socket.
    pub bind_addr: SocketAddr,
    /// Where the discovery request is broadcast.
    pub broadcast_addr: SocketAddr,
}

impl PlugClientConfig {
    pub fn new(timeout_seconds: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_seconds),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DISCOVERY_BIND_PORT)),
            broadcast_addr: SocketAddr::from(([255, 255, 255, 255], DEVICE_PORT)),
        }
    }
}

pub struct PlugClient {
    config: PlugClientConfig,
}

impl PlugClient {
    pub fn new(config: PlugClientConfig) -> Self {
        Self { config }
    }

    /// Runs one full polling cycle against the plugs: discover, fan out
    /// status queries, map readings to samples, sanitize against the last
    /// measurement.
    ///
    /// Network trouble degrades to a measurement with zero samples rather
    /// than an error: an offline segment should not crash the exporter.
    pub async fn get_measurement(
        &self,
        config: &MeteringConfig,
        last_measurement: Option<&Measurement>,
    ) -> Measurement {
        let mut measurement = Measurement {
            id: Uuid::new_v4().to_string(),
            source: SOURCE.to_string(),
            location: config.location.clone(),
            samples: Vec::new(),
            measured_at_time: Utc::now(),
        };

        info!("Discovering devices...");
        match self.discover().await {
            Err(e) => warn!("Failed discovering devices: {}", e),
            Ok(devices) => {
                info!("Discovered {} devices", devices.len());

                match self.query_all(devices).await {
                    Err(e) => warn!("Failed querying devices, dropping cycle: {}", e),
                    Ok(devices) => {
                        for device in &devices {
                            measurement.samples.extend(build_samples(config, device));
                        }
                    }
                }
            }
        }

        if let Some(last) = last_measurement {
            measurement.samples = sanitize_samples(measurement.samples, &last.samples);
        }

        measurement
    }

    /// Broadcasts one discovery request and collects replies for the
    /// configured window. A single background task drains the socket into a
    /// bounded queue; this loop consumes it under an explicit deadline, so
    /// the window closes without busy-polling. Replies are deduplicated by
    /// source IP: the same plug answering twice must not be queried twice.
    ///
    /// Zero replies is a valid empty result; only socket setup or send
    /// failures are errors.
    pub async fn discover(&self) -> Result<Vec<Device>, PlugError> {
        let socket = UdpSocket::bind(self.config.bind_addr).await?;
        socket.set_broadcast(true)?;
        let socket = Arc::new(socket);

        let (reply_tx, mut reply_rx) =
            mpsc::channel::<(SocketAddr, Vec<u8>)>(DISCOVERY_QUEUE_DEPTH);

        let drain_socket = socket.clone();
        let drain = tokio::spawn(async move {
            let mut buffer = [0u8; READ_BUFFER_SIZE];
            loop {
                let (len, addr) = match drain_socket.recv_from(&mut buffer).await {
                    Ok(received) => received,
                    Err(e) => {
                        debug!("Discovery socket closed: {}", e);
                        break;
                    }
                };
                let payload = cipher::decrypt(&buffer[..len]);
                if reply_tx.send((addr, payload)).await.is_err() {
                    break;
                }
            }
        });

        let request = serde_json::to_vec(&DeviceInfoRequest::default())?;
        socket
            .send_to(&cipher::encrypt(&request), self.config.broadcast_addr)
            .await?;

        let deadline = Instant::now() + self.config.timeout;
        let mut devices = Vec::new();
        let mut seen: HashSet<IpAddr> = HashSet::new();

        loop {
            let (addr, raw) = match timeout_at(deadline, reply_rx.recv()).await {
                // window elapsed; later datagrams belong to no cycle
                Err(_) => break,
                Ok(None) => break,
                Ok(Some(reply)) => reply,
            };

            if !seen.insert(addr.ip()) {
                debug!("Duplicate discovery reply from {}, ignoring", addr);
                continue;
            }

            match serde_json::from_slice::<DeviceInfoResponse>(&raw) {
                Ok(info) => {
                    debug!(
                        "Discovery reply from {} ({} bytes, alias {:?})",
                        addr,
                        raw.len(),
                        info.alias()
                    );
                    devices.push(Device {
                        addr,
                        raw,
                        info,
                        status: None,
                    });
                }
                Err(e) => warn!("Undecipherable discovery reply from {}: {}", addr, e),
            }
        }

        drain.abort();
        Ok(devices)
    }

    /// Queries every discovered plug concurrently, one task per plug, no
    /// shared state between them. All tasks are joined before results are
    /// inspected; each task bounds its own I/O, so a silent plug cannot
    /// stall the barrier.
    ///
    /// All-or-nothing: any single failure discards the whole set and
    /// returns the first error. A half-populated batch is worse than none.
    pub async fn query_all(&self, devices: Vec<Device>) -> Result<Vec<Device>, PlugError> {
        let handles: Vec<_> = devices
            .into_iter()
            .map(|device| {
                let timeout = self.config.timeout;
                tokio::spawn(async move { query_device(device, timeout).await })
            })
            .collect();

        let mut queried = Vec::with_capacity(handles.len());
        let mut first_error = None;

        for joined in join_all(handles).await {
            let result = joined.map_err(|e| {
                PlugError::Io(std::io::Error::other(format!("query task panicked: {e}")))
            });
            match result.and_then(|r| r) {
                Ok(device) => queried.push(device),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(queried),
        }
    }
}

/// Opens a TCP connection to the plug, sends the ciphered and framed status
/// request and parses the reply into the device record. Connect, write and
/// both reads are each bounded by `io_timeout`.
pub async fn query_device(mut device: Device, io_timeout: Duration) -> Result<Device, PlugError> {
    let addr = device.addr;

    let mut stream = timeout(io_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| PlugError::Timeout(addr))??;

    let request = serde_json::to_vec(&DeviceInfoRequest::default())?;
    timeout(io_timeout, stream.write_all(&framing::frame(&request)))
        .await
        .map_err(|_| PlugError::Timeout(addr))??;
    stream.flush().await?;

    let length = timeout(io_timeout, framing::read_header(&mut stream))
        .await
        .map_err(|_| PlugError::Timeout(addr))??;
    let payload = timeout(io_timeout, framing::read_payload(&mut stream, length))
        .await
        .map_err(|_| PlugError::Timeout(addr))??;

    let decrypted = cipher::decrypt(&payload);
    let status: DeviceInfoResponse = serde_json::from_slice(&decrypted)
        .map_err(|e| PlugError::Protocol { addr, source: e })?;

    debug!("Queried {} ({:?})", addr, status.alias());
    device.status = Some(status);
    Ok(device)
}

/// Maps one plug's live status to samples: the cumulative consumption
/// counter (scaled by the configured multiplier) and an instantaneous power
/// gauge. Plugs without a sysinfo or emeter block yield nothing.
fn build_samples(config: &MeteringConfig, device: &Device) -> Vec<Sample> {
    let Some(status) = &device.status else {
        return Vec::new();
    };
    let (Some(alias), Some(realtime)) = (status.alias(), status.realtime()) else {
        warn!("Device {} reported no usable status, skipping", device.addr);
        return Vec::new();
    };

    vec![
        Sample {
            entity_type: config.entity_type,
            entity_name: config.entity_name.clone(),
            sample_type: config.sample_type,
            sample_name: alias.to_string(),
            metric_type: config.metric_type,
            value: realtime.total_wh * config.value_multiplier,
        },
        Sample {
            entity_type: config.entity_type,
            entity_name: config.entity_name.clone(),
            sample_type: config.sample_type,
            sample_name: alias.to_string(),
            metric_type: MetricType::Gauge,
            value: realtime.power_mw / 1000.0,
        },
    ]
}
