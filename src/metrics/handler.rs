//! Instrumentation of the metrics endpoint itself, plus process metrics.

use prometheus::{IntCounterVec, IntGauge, Opts, Registry};

use super::{MetricsError, register_with_retry};

/// Requests served by the metrics handler, by HTTP status code.
#[derive(Debug, Clone)]
pub struct HandlerMetrics {
    pub requests: IntCounterVec,
    pub in_flight: IntGauge,
}

impl HandlerMetrics {
    pub fn new() -> Result<Self, MetricsError> {
        Ok(Self {
            requests: IntCounterVec::new(
                Opts::new(
                    "promhttp_metric_handler_requests_total",
                    "Total number of scrapes by HTTP status code.",
                ),
                &["code"],
            )?,
            in_flight: IntGauge::with_opts(Opts::new(
                "promhttp_metric_handler_requests_in_flight",
                "Current number of scrapes being served.",
            ))?,
        })
    }

    /// Create the handler metrics and register them in `registry`.
    pub fn registered(registry: &Registry) -> Result<Self, MetricsError> {
        let metrics = Self::new()?;
        register_with_retry(registry, &metrics.requests)?;
        register_with_retry(registry, &metrics.in_flight)?;
        Ok(metrics)
    }

    /// Count a request as in flight until the guard is dropped.
    pub fn track(&self) -> InFlight {
        self.in_flight.inc();
        InFlight(self.in_flight.clone())
    }

    /// Count a finished request.
    pub fn observe(&self, code: u16) {
        self.requests
            .with_label_values(&[code.to_string().as_str()])
            .inc();
    }

    pub fn requests_for(&self, code: u16) -> u64 {
        self.requests
            .with_label_values(&[code.to_string().as_str()])
            .get()
    }
}

/// Decrements the in-flight gauge on drop.
#[derive(Debug)]
pub struct InFlight(IntGauge);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// Register the `process_*` metrics of the running process.
///
/// Only Linux exposes them; elsewhere this does nothing.
#[cfg(target_os = "linux")]
pub fn register_process_collector(registry: &Registry) -> Result<(), MetricsError> {
    let collector = prometheus::process_collector::ProcessCollector::for_self();
    registry.register(Box::new(collector))?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn register_process_collector(_registry: &Registry) -> Result<(), MetricsError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_guard() {
        let metrics = HandlerMetrics::new().unwrap();
        let first = metrics.track();
        let second = metrics.track();
        assert_eq!(metrics.in_flight.get(), 2);

        drop(first);
        assert_eq!(metrics.in_flight.get(), 1);
        drop(second);
        assert_eq!(metrics.in_flight.get(), 0);
    }

    #[test]
    fn test_requests_by_code() {
        let registry = Registry::new();
        let metrics = HandlerMetrics::registered(&registry).unwrap();
        metrics.observe(200);
        metrics.observe(200);
        metrics.observe(503);

        assert_eq!(metrics.requests_for(200), 2);
        assert_eq!(metrics.requests_for(503), 1);

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"promhttp_metric_handler_requests_total".to_string()));
        assert!(names.contains(&"promhttp_metric_handler_requests_in_flight".to_string()));
    }

    #[test]
    fn test_registered_twice_replaces() {
        let registry = Registry::new();
        HandlerMetrics::registered(&registry).unwrap();
        let metrics = HandlerMetrics::registered(&registry).unwrap();
        metrics.observe(200);
        assert_eq!(metrics.requests_for(200), 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_process_collector() {
        let registry = Registry::new();
        register_process_collector(&registry).unwrap();

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"process_resident_memory_bytes".to_string()));
    }
}
