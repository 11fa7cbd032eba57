//! Application configuration structures.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::probe::DEFAULT_MTR_PROGRAM;
use crate::target::Target;

use super::validation::{ConfigError, split_list};

// =============================================================================
// Constants
// =============================================================================

/// Default exporter port.
pub const DEFAULT_PORT: u16 = 9273;

/// Default path of the metrics endpoint.
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Default number of concurrent scrape requests.
pub const DEFAULT_MAX_REQUESTS: usize = 40;

/// Default packets per probe.
pub const DEFAULT_PACKETS_NUM: u32 = 10;

/// Default packet size in bytes.
pub const DEFAULT_PACKET_SIZE: u32 = 1500;

/// Default per-packet timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT: u32 = 3;

/// Default probe list.
pub const DEFAULT_CHECK_TARGET: &str = "ICMP";

/// Default extra budget added to each probe deadline (10 seconds).
pub const DEFAULT_MTR_TIMEOUT: Duration = Duration::from_secs(10);

/// Default collector kinds.
pub const DEFAULT_LATENCY_TYPES: &str = "node_collector";

/// Default node name when none is given.
pub const DEFAULT_NODE_NAME: &str = "localhost";

/// Default node inventory sync interval (10 seconds).
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(10);

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_metrics_path() -> String {
    DEFAULT_METRICS_PATH.to_string()
}

fn default_mtr_timeout() -> Duration {
    DEFAULT_MTR_TIMEOUT
}

fn default_sync_interval() -> Duration {
    DEFAULT_SYNC_INTERVAL
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Web server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 9273).
    pub port: u16,

    /// Path under which metrics are exposed (default: "/metrics").
    pub metrics_path: String,

    /// Maximum number of concurrent scrape requests, 0 to disable (default: 40).
    pub max_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: DEFAULT_PORT,
            metrics_path: default_metrics_path(),
            max_requests: DEFAULT_MAX_REQUESTS,
        }
    }
}

// =============================================================================
// Probe Configuration
// =============================================================================

/// Probe parameters shared by every collector kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Packets sent per probe (default: 10).
    pub packets: u32,

    /// Packet size in bytes (default: 1500).
    pub packet_size: u32,

    /// Per-packet timeout in seconds (default: 3).
    pub request_timeout: u32,

    /// Probes to run against every target, e.g. `ICMP,TCP:80` (default: "ICMP").
    pub check_target: String,

    /// Budget added to one second per packet for each probe (default: 10s).
    #[serde(default = "default_mtr_timeout", with = "humantime_serde")]
    pub mtr_timeout: Duration,

    /// Path or name of the mtr binary (default: "mtr").
    pub program: PathBuf,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            packets: DEFAULT_PACKETS_NUM,
            packet_size: DEFAULT_PACKET_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            check_target: DEFAULT_CHECK_TARGET.to_string(),
            mtr_timeout: DEFAULT_MTR_TIMEOUT,
            program: PathBuf::from(DEFAULT_MTR_PROGRAM),
        }
    }
}

// =============================================================================
// Discovery Configuration
// =============================================================================

/// Cluster node discovery configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Discover targets from the node inventory (default: true).
    pub enabled: bool,

    /// Name of the local node, excluded from targets (default: "localhost").
    pub node_name: String,

    /// YAML node inventory watched for changes.
    pub nodes_file: Option<PathBuf>,

    /// How often the node inventory is checked for changes (default: 10s).
    #[serde(default = "default_sync_interval", with = "humantime_serde")]
    pub sync_interval: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            node_name: DEFAULT_NODE_NAME.to_string(),
            nodes_file: None,
            sync_interval: DEFAULT_SYNC_INTERVAL,
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Web server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Probe parameters.
    #[serde(default)]
    pub probe: ProbeSettings,

    /// Enabled collector kinds, comma separated (default: "node_collector").
    #[serde(default = "default_latency_types")]
    pub latency_types: String,

    /// Node discovery.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Static targets, probed when discovery is disabled.
    #[serde(default)]
    pub targets: Vec<Target>,

    /// Optional prefix of the latency metric names.
    #[serde(default)]
    pub metric_prefix: String,
}

fn default_latency_types() -> String {
    DEFAULT_LATENCY_TYPES.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            probe: ProbeSettings::default(),
            latency_types: default_latency_types(),
            discovery: DiscoveryConfig::default(),
            targets: Vec::new(),
            metric_prefix: String::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Collector kind names listed in `latency_types`.
    pub fn latency_type_names(&self) -> Vec<String> {
        split_list(&self.latency_types)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate server bind address
        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid server bind address: '{}'",
                self.server.bind
            ))
        })?;

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server port must be non-zero".to_string(),
            ));
        }

        if !self.server.metrics_path.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "metrics path must start with '/': '{}'",
                self.server.metrics_path
            )));
        }

        for (name, value) in [
            ("packets", self.probe.packets),
            ("packet_size", self.probe.packet_size),
            ("request_timeout", self.probe.request_timeout),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "probe {name} must be positive"
                )));
            }
        }

        if self.discovery.sync_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "discovery sync_interval must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 9273);
        assert_eq!(config.metrics_path, "/metrics");
        assert_eq!(config.max_requests, 40);
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.probe.packets, 10);
        assert_eq!(config.probe.packet_size, 1500);
        assert_eq!(config.probe.request_timeout, 3);
        assert_eq!(config.probe.check_target, "ICMP");
        assert_eq!(config.probe.mtr_timeout, Duration::from_secs(10));
        assert_eq!(config.latency_type_names(), vec!["node_collector"]);
        assert!(config.discovery.enabled);
        assert_eq!(config.discovery.node_name, "localhost");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  port: 9300
  metrics_path: /probe
probe:
  packets: 5
  check_target: "ICMP,TCP:22"
  mtr_timeout: 5s
latency_types: node_collector,pod_collector
discovery:
  enabled: false
  node_name: node-a
  sync_interval: 30s
targets:
  - ipAddress: 10.0.0.2
    name: node-b
  - ipAddress: 10.0.0.3
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9300);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.metrics_path, "/probe");
        assert_eq!(config.probe.packets, 5);
        assert_eq!(config.probe.packet_size, 1500);
        assert_eq!(config.probe.mtr_timeout, Duration::from_secs(5));
        assert_eq!(
            config.latency_type_names(),
            vec!["node_collector", "pod_collector"]
        );
        assert!(!config.discovery.enabled);
        assert_eq!(config.discovery.sync_interval, Duration::from_secs(30));
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[1].name, "");
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{}}").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_shipped_config() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/config.yaml");
        let config = AppConfig::load(path).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.discovery.node_name, "node-a");
        assert_eq!(config.targets.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let result = AppConfig::load("/nonexistent/config.yaml");
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_config_validation_invalid_bind_address() {
        let mut config = AppConfig::default();
        config.server.bind = "not-an-ip".to_string();

        let result = config.validate();
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("invalid server bind address")
        );
    }

    #[test]
    fn test_config_validation_invalid_values() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.metrics_path = "metrics".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.probe.packets = 0;
        assert!(config.validate().unwrap_err().to_string().contains("packets"));

        let mut config = AppConfig::default();
        config.discovery.sync_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
