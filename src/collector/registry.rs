//! Collector registry: runs every enabled collector on each scrape.

use std::sync::Arc;
use std::time::{Duration, Instant};

use prometheus::Registry;
use prometheus::proto::MetricFamily;
use tokio::sync::RwLock;

use crate::collector::{Collector, CollectorError, ScrapeContext};
use crate::metrics::{self, MetricsError, ScrapeMetrics};

/// Outcome of one collector inside a scrape.
struct CollectorRun {
    label: String,
    elapsed: Duration,
    result: Result<(), CollectorError>,
    families: Vec<MetricFamily>,
}

/// Registry of the collectors run on every scrape.
///
/// Scrape counters are registered once in the process registry and carried
/// between scrapes; collector families are rebuilt each time.
pub struct CollectorRegistry {
    collectors: RwLock<Vec<Arc<dyn Collector>>>,
    scrape_metrics: ScrapeMetrics,
    registry: Registry,
}

impl CollectorRegistry {
    /// Create a registry and register the scrape counters in `registry`.
    pub fn new(registry: Registry) -> Result<Self, MetricsError> {
        let scrape_metrics = ScrapeMetrics::new()?;
        scrape_metrics.register(&registry)?;
        Ok(Self {
            collectors: RwLock::new(Vec::new()),
            scrape_metrics,
            registry,
        })
    }

    /// Add a collector to every following scrape.
    pub async fn register<C: Collector>(&self, collector: C) {
        self.register_arc(Arc::new(collector)).await;
    }

    pub async fn register_arc(&self, collector: Arc<dyn Collector>) {
        tracing::info!(collector = %collector.name(), "Collector registered");
        self.collectors.write().await.push(collector);
    }

    pub async fn collector_count(&self) -> usize {
        self.collectors.read().await.len()
    }

    pub fn scrape_metrics(&self) -> &ScrapeMetrics {
        &self.scrape_metrics
    }

    /// Process registry holding the scrape counters and build info.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run all collectors concurrently and gather every family of this scrape.
    ///
    /// The collector list stays read-locked until every collector finished, so
    /// registration waits for in-flight scrapes.
    pub async fn scrape(&self, ctx: &ScrapeContext) -> Vec<MetricFamily> {
        self.scrape_metrics.begin_scrape();

        let collectors = self.collectors.read().await;
        let mut pending = Vec::with_capacity(collectors.len());
        for collector in collectors.iter() {
            let label = metrics::collector_label(collector.name());
            let handle = tokio::spawn(run_collector(
                Arc::clone(collector),
                label.clone(),
                *ctx,
            ));
            pending.push((label, handle));
        }

        let mut families = Vec::new();
        let mut durations = Vec::with_capacity(pending.len());
        for (label, handle) in pending {
            let run = match handle.await {
                Ok(run) => run,
                Err(e) => {
                    tracing::error!(
                        collector = %label,
                        error = %e,
                        "Collector task did not complete"
                    );
                    CollectorRun {
                        label,
                        elapsed: Duration::ZERO,
                        result: Err(CollectorError::Task(e.to_string())),
                        families: Vec::new(),
                    }
                }
            };
            if run.result.is_err() {
                self.scrape_metrics.record_failure(&run.label);
            }
            families.extend(run.families);
            durations.push((run.label, run.elapsed));
        }
        drop(collectors);

        match metrics::collector_duration_families(&durations) {
            Ok(duration) => families.extend(duration),
            Err(e) => tracing::error!(error = %e, "Failed to build collector durations"),
        }
        families.extend(self.registry.gather());
        families
    }

    /// Scrape and encode in the text exposition format.
    pub async fn render(&self, ctx: &ScrapeContext) -> Result<String, MetricsError> {
        let families = self.scrape(ctx).await;
        metrics::encode_text(&families)
    }
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field(
                "collector_count",
                &self.collectors.try_read().map(|c| c.len()).unwrap_or(0),
            )
            .finish_non_exhaustive()
    }
}

/// Execute a single collector and time it.
async fn run_collector(
    collector: Arc<dyn Collector>,
    label: String,
    ctx: ScrapeContext,
) -> CollectorRun {
    let start = Instant::now();
    tracing::debug!(collector = %label, "Running collection");

    let mut families = Vec::new();
    let result = collector.scrape(&ctx, &mut families).await;
    let elapsed = start.elapsed();

    match &result {
        Ok(()) => {
            tracing::debug!(
                collector = %label,
                duration_seconds = elapsed.as_secs_f64(),
                "Collector succeeded"
            );
        }
        Err(e) => {
            tracing::error!(
                collector = %label,
                duration_seconds = elapsed.as_secs_f64(),
                error = %e,
                "Collector failed"
            );
        }
    }

    CollectorRun {
        label,
        elapsed,
        result,
        families,
    }
}
