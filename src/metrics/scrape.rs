//! Scrape-level counters and the per-collector duration gauge.

use std::time::Duration;

use prometheus::core::Collector as PromCollector;
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry};

use super::MetricsError;

/// Namespace of the exporter's own metrics.
pub const NAMESPACE: &str = "monitoring";
/// Subsystem of the exporter's own metrics.
pub const SUBSYSTEM: &str = "scrape";
/// Prefix of the `collector` label values.
pub const COLLECTOR_LABEL_PREFIX: &str = "collector.";
/// Name of the build info gauge.
pub const BUILD_INFO_NAME: &str = "network_latency_exporter_build_info";

/// `collector` label value for a collector name.
pub fn collector_label(name: &str) -> String {
    format!("{COLLECTOR_LABEL_PREFIX}{name}")
}

/// Counters that live for the whole process and are carried between scrapes.
#[derive(Debug, Clone)]
pub struct ScrapeMetrics {
    pub total_scrapes: IntCounter,
    pub scrape_errors: IntCounterVec,
    pub last_scrape_error: IntGauge,
}

impl ScrapeMetrics {
    pub fn new() -> Result<Self, MetricsError> {
        Ok(Self {
            total_scrapes: IntCounter::with_opts(
                Opts::new("scrapes_total", "Total number of times metrics were scraped.")
                    .namespace(NAMESPACE)
                    .subsystem(SUBSYSTEM),
            )?,
            scrape_errors: IntCounterVec::new(
                Opts::new(
                    "scrape_errors_total",
                    "Total number of times an error occurred while scraping metrics.",
                )
                .namespace(NAMESPACE)
                .subsystem(SUBSYSTEM),
                &["collector"],
            )?,
            last_scrape_error: IntGauge::with_opts(
                Opts::new(
                    "last_scrape_error",
                    "Whether the last scrape of metrics resulted in an error (1 for error, 0 for success).",
                )
                .namespace(NAMESPACE)
                .subsystem(SUBSYSTEM),
            )?,
        })
    }

    /// Register all counters, replacing stale registrations once.
    pub fn register(&self, registry: &Registry) -> Result<(), MetricsError> {
        register_with_retry(registry, &self.total_scrapes)?;
        register_with_retry(registry, &self.scrape_errors)?;
        register_with_retry(registry, &self.last_scrape_error)?;
        Ok(())
    }

    /// Count a new scrape and clear the error flag.
    pub fn begin_scrape(&self) {
        self.total_scrapes.inc();
        self.last_scrape_error.set(0);
    }

    /// Record a failed collector run.
    pub fn record_failure(&self, collector_label: &str) {
        self.scrape_errors.with_label_values(&[collector_label]).inc();
        self.last_scrape_error.set(1);
    }

    pub fn errors_for(&self, collector_label: &str) -> u64 {
        self.scrape_errors
            .with_label_values(&[collector_label])
            .get()
    }
}

/// Register `collector`; on a duplicate registration unregister the previous
/// one and try exactly once more.
pub fn register_with_retry<C>(registry: &Registry, collector: &C) -> Result<(), MetricsError>
where
    C: PromCollector + Clone + 'static,
{
    match registry.register(Box::new(collector.clone())) {
        Ok(()) => Ok(()),
        Err(prometheus::Error::AlreadyReg) => {
            tracing::warn!("Metric already registered, re-registering");
            registry
                .unregister(Box::new(collector.clone()))
                .map_err(MetricsError::Registration)?;
            registry
                .register(Box::new(collector.clone()))
                .map_err(MetricsError::Registration)
        }
        Err(e) => Err(MetricsError::Registration(e)),
    }
}

/// Build the `collector_duration_seconds` gauge for one scrape.
pub fn collector_duration_families(
    durations: &[(String, Duration)],
) -> Result<Vec<MetricFamily>, MetricsError> {
    let gauge = GaugeVec::new(
        Opts::new(
            "collector_duration_seconds",
            "network_latency_exporter: Duration of a collector scrape.",
        )
        .namespace(NAMESPACE)
        .subsystem(SUBSYSTEM),
        &["collector"],
    )?;
    for (label, elapsed) in durations {
        gauge
            .with_label_values(&[label.as_str()])
            .set(elapsed.as_secs_f64());
    }
    Ok(gauge.collect())
}

/// Build info gauge, always 1, labeled with the crate version.
pub fn build_info(version: &str) -> Result<IntGaugeVec, MetricsError> {
    let gauge = IntGaugeVec::new(
        Opts::new(
            BUILD_INFO_NAME,
            "A metric with a constant '1' value labeled by the exporter version.",
        ),
        &["version"],
    )?;
    gauge.with_label_values(&[version]).set(1);
    Ok(gauge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_metrics_lifecycle() {
        let metrics = ScrapeMetrics::new().unwrap();

        metrics.begin_scrape();
        assert_eq!(metrics.total_scrapes.get(), 1);
        assert_eq!(metrics.last_scrape_error.get(), 0);

        metrics.record_failure("collector.node_collector");
        assert_eq!(metrics.last_scrape_error.get(), 1);
        assert_eq!(metrics.errors_for("collector.node_collector"), 1);

        metrics.begin_scrape();
        assert_eq!(metrics.total_scrapes.get(), 2);
        assert_eq!(metrics.last_scrape_error.get(), 0);
        assert_eq!(metrics.errors_for("collector.node_collector"), 1);
    }

    #[test]
    fn test_register_names() {
        let registry = Registry::new();
        let metrics = ScrapeMetrics::new().unwrap();
        metrics.register(&registry).unwrap();
        metrics.record_failure("collector.node_collector");

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"monitoring_scrape_scrapes_total".to_string()));
        assert!(names.contains(&"monitoring_scrape_scrape_errors_total".to_string()));
        assert!(names.contains(&"monitoring_scrape_last_scrape_error".to_string()));
    }

    #[test]
    fn test_register_twice_replaces() {
        let registry = Registry::new();
        let first = ScrapeMetrics::new().unwrap();
        first.register(&registry).unwrap();
        first.total_scrapes.inc();

        // A fresh instance with identical descriptors replaces the old one.
        let second = ScrapeMetrics::new().unwrap();
        second.register(&registry).unwrap();

        let total = registry
            .gather()
            .into_iter()
            .find(|f| f.get_name() == "monitoring_scrape_scrapes_total")
            .unwrap();
        assert_eq!(total.get_metric()[0].get_counter().get_value(), 0.0);
    }

    #[test]
    fn test_collector_duration_families() {
        let families = collector_duration_families(&[
            (collector_label("node_collector"), Duration::from_millis(1500)),
        ])
        .unwrap();

        assert_eq!(families.len(), 1);
        assert_eq!(
            families[0].get_name(),
            "monitoring_scrape_collector_duration_seconds"
        );
        assert_eq!(families[0].get_metric()[0].get_gauge().get_value(), 1.5);
    }

    #[test]
    fn test_build_info() {
        let registry = Registry::new();
        let info = build_info("1.2.3").unwrap();
        register_with_retry(&registry, &info).unwrap();

        let families = registry.gather();
        assert_eq!(families[0].get_name(), BUILD_INFO_NAME);
        assert_eq!(families[0].get_metric()[0].get_gauge().get_value(), 1.0);
    }
}
