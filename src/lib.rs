//! Network Latency Exporter
//!
//! Measures network latency from the local node to every other cluster node
//! with `mtr` and exposes the results as Prometheus metrics.
//!
//! # Architecture
//!
//! - **Targets**: Destinations discovered from the cluster node inventory
//! - **Probes**: Concurrent `mtr` runs over targets x protocol/port pairs
//! - **Collectors**: Per-kind probe configuration run on every scrape
//! - **Metrics**: `network_latency_*` gauges and scrape counters
//! - **Server**: Metrics, liveness and readiness endpoints
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use network_latency_exporter::{
//!     CollectorRegistry, ConfigContainer, InitParams, LatencyMetrics, MtrRunner, NodeCollector,
//!     ProbeExecutor, ScrapeContext, TargetRegistry, Target, parse_probe_specs,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let container = Arc::new(ConfigContainer::new());
//! container
//!     .initialize_once(InitParams {
//!         packets_sent: "10".to_string(),
//!         packet_size: "1500".to_string(),
//!         probe_timeout: "3".to_string(),
//!         probe_specs: parse_probe_specs("ICMP,TCP:22"),
//!         targets: TargetRegistry::validated(vec![Target::new("10.0.0.2", "node-b")]),
//!         metrics_path: "/metrics".to_string(),
//!         kinds: vec!["node_collector".to_string()],
//!     })
//!     .await?;
//!
//! let registry = CollectorRegistry::new(prometheus::Registry::new())?;
//! let executor = ProbeExecutor::new(Arc::new(MtrRunner::default()));
//! registry
//!     .register(NodeCollector::new(container, executor, LatencyMetrics::new("node-a")))
//!     .await;
//! println!("{}", registry.render(&ScrapeContext::new()).await?);
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod discovery;
pub mod metrics;
pub mod probe;
pub mod server;
pub mod target;

pub use collector::{
    Collector, CollectorConfig, CollectorError, CollectorKind, CollectorRegistry,
    ConfigContainer, InitParams, NodeCollector, ScrapeContext,
};
pub use config::{AppConfig, ConfigError};
pub use discovery::{
    Discovery, DiscoveryError, FileNodeSource, Node, NodeEvent, NodeEventKind, NodeSource,
    NodeWatcher,
};
pub use metrics::{LatencyMetrics, MetricsError, ScrapeMetrics};
pub use probe::{
    LatencyRecord, MtrRunner, ProbeConfig, ProbeError, ProbeExecutor, ProbeRunner, ProbeSpec,
    ProbeStatus, Protocol, parse_probe_specs,
};
pub use server::{AppState, create_router};
pub use target::{Target, TargetRegistry};
