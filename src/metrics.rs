//! Metrics Layer
//!
//! Prometheus exposition for the exporter:
//!
//! - [`LatencyMetrics`]: per-scrape `network_latency_*` gauges built from latency records
//! - [`ScrapeMetrics`]: process-lifetime scrape counters under `monitoring_scrape_*`
//! - [`HandlerMetrics`]: requests served by the metrics endpoint
//! - [`encode_text`]: text exposition of gathered families

mod handler;
mod latency;
mod scrape;

pub use handler::{HandlerMetrics, InFlight, register_process_collector};
pub use latency::{Dimension, LATENCY_LABELS, LatencyMetrics, MEASUREMENT_NAME};
pub use scrape::{
    BUILD_INFO_NAME, COLLECTOR_LABEL_PREFIX, NAMESPACE, SUBSYSTEM, ScrapeMetrics, build_info,
    collector_duration_families, collector_label, register_with_retry,
};

use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};
use thiserror::Error;

/// Content type of the text exposition format.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Errors raised while building or encoding metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metric registration failed: {0}")]
    Registration(#[from] prometheus::Error),

    #[error("failed to encode metrics: {0}")]
    Encode(String),
}

/// Encode families in the Prometheus text format, sorted by name.
///
/// Families without samples are skipped; the encoder rejects them.
pub fn encode_text(families: &[MetricFamily]) -> Result<String, MetricsError> {
    let mut sorted: Vec<MetricFamily> = families
        .iter()
        .filter(|f| !f.get_metric().is_empty())
        .cloned()
        .collect();
    sorted.sort_by(|a, b| a.get_name().cmp(b.get_name()));

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&sorted, &mut buffer)
        .map_err(|e| MetricsError::Encode(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| MetricsError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{IntCounter, Registry};

    #[test]
    fn test_encode_text_sorted() {
        let registry = Registry::new();
        let b = IntCounter::new("b_total", "second").unwrap();
        let a = IntCounter::new("a_total", "first").unwrap();
        registry.register(Box::new(b.clone())).unwrap();
        registry.register(Box::new(a.clone())).unwrap();
        a.inc();

        let mut families = registry.gather();
        families.reverse();
        let text = encode_text(&families).unwrap();

        let a_pos = text.find("a_total 1").unwrap();
        let b_pos = text.find("b_total 0").unwrap();
        assert!(a_pos < b_pos);
        assert!(text.contains("# HELP a_total first"));
        assert!(text.contains("# TYPE b_total counter"));
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode_text(&[]).unwrap(), "");

        let families = collector_duration_families(&[]).unwrap();
        assert_eq!(encode_text(&families).unwrap(), "");
    }
}
