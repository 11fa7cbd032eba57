//! Configuration module for the exporter.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (bind address, port, metrics path, request bound)
//! - Probe settings (packets, packet size, timeouts, probe list)
//! - Discovery settings (node name, node inventory, sync interval)
//! - Static targets
//!
//! Every value can be overridden on the command line or through the
//! environment; see the binary's `--help`.

mod app;
mod validation;

pub use app::{AppConfig, DiscoveryConfig, ProbeSettings, ServerConfig};
pub use validation::{ConfigError, split_list};

// Re-export constants
pub use app::{
    DEFAULT_CHECK_TARGET, DEFAULT_LATENCY_TYPES, DEFAULT_MAX_REQUESTS, DEFAULT_METRICS_PATH,
    DEFAULT_MTR_TIMEOUT, DEFAULT_NODE_NAME, DEFAULT_PACKET_SIZE, DEFAULT_PACKETS_NUM,
    DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SYNC_INTERVAL,
};
