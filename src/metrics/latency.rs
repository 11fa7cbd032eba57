//! Latency records -> `network_latency_*` gauges.

use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts, Registry};

use crate::probe::LatencyRecord;

/// Base name shared by all latency gauges.
pub const MEASUREMENT_NAME: &str = "network_latency";

/// Label names of every latency gauge, in label-value order.
pub const LATENCY_LABELS: [&str; 6] = [
    "source",
    "destination",
    "destinationIp",
    "packets",
    "protocol",
    "port",
];

/// One measured dimension of a latency record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Status,
    Sent,
    Received,
    RttMean,
    RttMin,
    RttMax,
    RttStddev,
    HopsNum,
}

impl Dimension {
    pub const ALL: [Dimension; 8] = [
        Self::Status,
        Self::Sent,
        Self::Received,
        Self::RttMean,
        Self::RttMin,
        Self::RttMax,
        Self::RttStddev,
        Self::HopsNum,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Sent => "sent",
            Self::Received => "received",
            Self::RttMean => "rtt_mean",
            Self::RttMin => "rtt_min",
            Self::RttMax => "rtt_max",
            Self::RttStddev => "rtt_stddev",
            Self::HopsNum => "hops_num",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Self::Status => "Status of network latency",
            Self::Sent => "Packets sent",
            Self::Received => "Packets received",
            Self::RttMean => "Average mean of packets RTT",
            Self::RttMin => "Best round trip time",
            Self::RttMax => "Worst round trip time",
            Self::RttStddev => "Standard deviation of packets mean RTT",
            Self::HopsNum => "Number of hops in packet path",
        }
    }

    /// Sample value of this dimension; RTTs are rounded to two decimals.
    pub fn value(&self, record: &LatencyRecord) -> f64 {
        match self {
            Self::Status => record.status.as_f64(),
            Self::Sent => record.packets_sent as f64,
            Self::Received => record.packets_received as f64,
            Self::RttMean => round2(record.rtt_mean),
            Self::RttMin => round2(record.rtt_min),
            Self::RttMax => round2(record.rtt_max),
            Self::RttStddev => round2(record.rtt_deviation),
            Self::HopsNum => record.hop_count as f64,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Builds the latency gauges of one scrape.
///
/// Gauges are created per scrape and never registered globally, so a target
/// that left the cluster disappears from the next scrape.
#[derive(Debug, Clone)]
pub struct LatencyMetrics {
    source: String,
    prefix: Option<String>,
}

impl LatencyMetrics {
    /// `source` is the local node name used as the `source` label.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            prefix: None,
        }
    }

    /// Prefix all metric names with `<prefix>_`. Empty prefixes are ignored.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Fully qualified name of a dimension's gauge.
    pub fn metric_name(&self, dimension: Dimension) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}_{MEASUREMENT_NAME}_{}", dimension.suffix()),
            None => format!("{MEASUREMENT_NAME}_{}", dimension.suffix()),
        }
    }

    /// Eight samples per record, one per [`Dimension`].
    pub fn families(
        &self,
        records: &[LatencyRecord],
    ) -> Result<Vec<MetricFamily>, prometheus::Error> {
        let registry = Registry::new();

        for dimension in Dimension::ALL {
            let gauge = GaugeVec::new(
                Opts::new(self.metric_name(dimension), dimension.help()),
                &LATENCY_LABELS,
            )?;
            for record in records {
                let packets = record.packets_sent.to_string();
                let labels = [
                    self.source.as_str(),
                    record.destination_name.as_str(),
                    record.destination_address.as_str(),
                    packets.as_str(),
                    record.protocol.as_ref(),
                    record.port.as_str(),
                ];
                gauge
                    .get_metric_with_label_values(&labels)?
                    .set(dimension.value(record));
            }
            registry.register(Box::new(gauge))?;
        }

        Ok(registry.gather())
    }
}
