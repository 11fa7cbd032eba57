//! Node-to-node latency collector.
//!
//! Takes a snapshot of the `node_collector` configuration, probes every
//! target with every probe spec and turns the records into latency gauges.

use std::sync::Arc;

use prometheus::proto::MetricFamily;

use crate::collector::{
    Collector, CollectorError, CollectorKind, ConfigContainer, ScrapeContext,
};
use crate::metrics::LatencyMetrics;
use crate::probe::ProbeExecutor;

/// Collector for the `node_collector` kind.
#[derive(Debug, Clone)]
pub struct NodeCollector {
    container: Arc<ConfigContainer>,
    executor: ProbeExecutor,
    metrics: LatencyMetrics,
}

impl NodeCollector {
    pub fn new(
        container: Arc<ConfigContainer>,
        executor: ProbeExecutor,
        metrics: LatencyMetrics,
    ) -> Self {
        Self {
            container,
            executor,
            metrics,
        }
    }
}

#[async_trait::async_trait]
impl Collector for NodeCollector {
    fn name(&self) -> &str {
        CollectorKind::NodeCollector.as_ref()
    }

    fn kind(&self) -> CollectorKind {
        CollectorKind::NodeCollector
    }

    async fn scrape(
        &self,
        ctx: &ScrapeContext,
        out: &mut Vec<MetricFamily>,
    ) -> Result<(), CollectorError> {
        let config = self
            .container
            .get_config(self.kind())
            .await
            .ok_or(CollectorError::NotConfigured(self.kind()))?
            .into_probe();

        let batch = self.executor.execute(&config, ctx.deadline).await;
        let total = batch.records.len();
        out.extend(self.metrics.families(&batch.records)?);

        if batch.has_failures() {
            return Err(CollectorError::Probe {
                failed: batch.failures,
                total,
            });
        }
        Ok(())
    }
}
