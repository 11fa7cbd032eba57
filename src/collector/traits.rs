//! Core collector traits and types.

use prometheus::proto::MetricFamily;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;
use tokio::time::Instant;

use crate::metrics::MetricsError;

/// Errors that can occur during a collector scrape.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The kind was never configured.
    #[error("collector '{0}' is not configured")]
    NotConfigured(CollectorKind),

    /// At least one probe failed. Records are still emitted.
    #[error("{failed} of {total} probes failed")]
    Probe { failed: usize, total: usize },

    /// Failed to build metric families.
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// The collector task panicked or was cancelled.
    #[error("collector task failed: {0}")]
    Task(String),
}

impl From<prometheus::Error> for CollectorError {
    fn from(e: prometheus::Error) -> Self {
        Self::Metrics(MetricsError::Registration(e))
    }
}

/// Category of measurement, each with its own configuration.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CollectorKind {
    /// Latency between cluster nodes.
    NodeCollector,
    /// Latency between pods. Configurable, but no executor is wired.
    PodCollector,
}

/// Per-scrape parameters handed to every collector.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrapeContext {
    /// Caller deadline derived from the scrape timeout header, if any.
    pub deadline: Option<Instant>,
}

impl ScrapeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Core collector trait.
///
/// A scrape always pushes whatever families it managed to build into `out`.
/// An `Err` marks the scrape as failed for the scrape counters; it does not
/// discard the pushed families. Unreachable destinations are observations,
/// not errors.
#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    /// Name used in the `collector` label, without the `collector.` prefix.
    fn name(&self) -> &str;

    fn kind(&self) -> CollectorKind;

    /// Run one scrape.
    async fn scrape(
        &self,
        ctx: &ScrapeContext,
        out: &mut Vec<MetricFamily>,
    ) -> Result<(), CollectorError>;
}
