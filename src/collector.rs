//! Collector Layer
//!
//! Pluggable collectors run concurrently on every scrape. Each one reads a
//! configuration snapshot from the shared [`ConfigContainer`] and pushes
//! metric families for the scrape.
//!
//! # Architecture
//!
//! - [`Collector`]: Core trait for implementing collectors
//! - [`ConfigContainer`]: Per-kind configuration with atomic target replacement
//! - [`CollectorRegistry`]: Runs all collectors per scrape and keeps the scrape counters
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use network_latency_exporter::{
//!     CollectorRegistry, ConfigContainer, LatencyMetrics, MtrRunner, NodeCollector,
//!     ProbeExecutor,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let container = Arc::new(ConfigContainer::new());
//! let executor = ProbeExecutor::new(Arc::new(MtrRunner::default()));
//! let registry = CollectorRegistry::new(prometheus::Registry::new())?;
//! registry
//!     .register(NodeCollector::new(container, executor, LatencyMetrics::new("node-a")))
//!     .await;
//! # Ok(())
//! # }
//! ```

mod container;
pub mod node;
mod registry;
mod traits;

pub use container::{CollectorConfig, ConfigContainer, InitParams};
pub use node::NodeCollector;
pub use registry::CollectorRegistry;
pub use traits::{Collector, CollectorError, CollectorKind, ScrapeContext};
