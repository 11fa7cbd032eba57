//! `mtr --json` report model and reachability classification.

use serde::Deserialize;

use super::spec::{ProbeSpec, Protocol};
use crate::target::Target;

/// Top-level document printed by `mtr --json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MtrOutput {
    pub report: MtrReport,
}

/// The report section; only the hop list is read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MtrReport {
    #[serde(rename = "hubs", default)]
    pub hops: Vec<MtrHop>,
}

/// One hop on the path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MtrHop {
    /// Host name or IP address of the hop (`-n` makes it an address).
    #[serde(default)]
    pub host: String,
    /// Lost packets, in percent.
    #[serde(rename = "Loss%", default)]
    pub loss: f64,
    #[serde(rename = "Avg", default)]
    pub rtt_mean: f64,
    #[serde(rename = "Best", default)]
    pub rtt_min: f64,
    #[serde(rename = "Wrst", default)]
    pub rtt_max: f64,
    #[serde(rename = "StDev", default)]
    pub rtt_deviation: f64,
}

impl MtrOutput {
    /// Parse raw tool output.
    pub fn from_slice(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }
}

/// Reachability of a destination.
///
/// The numeric values are exported as-is in the `status` gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeStatus {
    /// Destination answered; some packets may still have been lost.
    Ok = 0,
    /// No hop on the path matched the destination.
    #[default]
    Unreachable = 1,
}

impl ProbeStatus {
    pub fn as_f64(self) -> f64 {
        self as i32 as f64
    }
}

/// Result of one probe against one destination for one protocol/port.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyRecord {
    pub destination_name: String,
    pub destination_address: String,
    pub protocol: Protocol,
    pub port: String,
    pub status: ProbeStatus,
    pub packets_sent: i64,
    pub packets_received: i64,
    /// Mean round trip time in milliseconds.
    pub rtt_mean: f64,
    pub rtt_min: f64,
    pub rtt_max: f64,
    pub rtt_deviation: f64,
    pub hop_count: usize,
}

impl LatencyRecord {
    /// An unreachable record with zeroed measurements.
    pub fn unreachable(target: &Target, spec: &ProbeSpec, packets_sent: i64) -> Self {
        Self {
            destination_name: target.name.clone(),
            destination_address: target.address.clone(),
            protocol: spec.protocol,
            port: spec.port.clone(),
            status: ProbeStatus::Unreachable,
            packets_sent,
            packets_received: 0,
            rtt_mean: 0.0,
            rtt_min: 0.0,
            rtt_max: 0.0,
            rtt_deviation: 0.0,
            hop_count: 0,
        }
    }

    /// Fold a parsed report into this record.
    ///
    /// Only a hop whose host equals the destination address verbatim marks the
    /// destination reachable; intermediate hops never contribute measurements.
    /// When several hops match, the last one wins.
    pub fn apply_report(&mut self, report: &MtrReport) {
        self.hop_count = report.hops.len();

        let Some(hop) = report
            .hops
            .iter()
            .rev()
            .find(|hop| hop.host == self.destination_address)
        else {
            return;
        };

        let lost = (self.packets_sent as f64 * hop.loss / 100.0).round() as i64;
        self.status = ProbeStatus::Ok;
        self.packets_received = self.packets_sent - lost;
        self.rtt_mean = hop.rtt_mean;
        self.rtt_min = hop.rtt_min;
        self.rtt_max = hop.rtt_max;
        self.rtt_deviation = hop.rtt_deviation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "report": {
            "mtr": {"src": "node-a", "dst": "10.0.0.7", "tos": 0, "psize": "64", "bitpattern": "0x00", "tests": 10},
            "hubs": [
                {"count": 1, "host": "10.0.0.1", "Loss%": 0.0, "Snt": 10, "Last": 0.3, "Avg": 0.4, "Best": 0.2, "Wrst": 0.9, "StDev": 0.1},
                {"count": 2, "host": "10.0.0.7", "Loss%": 20.0, "Snt": 10, "Last": 1.1, "Avg": 1.234, "Best": 0.9, "Wrst": 2.5, "StDev": 0.333}
            ]
        }
    }"#;

    fn record(address: &str, sent: i64) -> LatencyRecord {
        LatencyRecord::unreachable(
            &Target::new(address, "node-b"),
            &ProbeSpec::new(Protocol::Icmp, "1"),
            sent,
        )
    }

    #[test]
    fn test_parse_sample_output() {
        let output = MtrOutput::from_slice(SAMPLE.as_bytes()).unwrap();
        assert_eq!(output.report.hops.len(), 2);
        assert_eq!(output.report.hops[1].host, "10.0.0.7");
        assert_eq!(output.report.hops[1].loss, 20.0);
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(MtrOutput::from_slice(b"mtr: unable to get raw sockets").is_err());
        assert!(MtrOutput::from_slice(b"").is_err());
    }

    #[test]
    fn test_apply_report_matching_hop() {
        let output = MtrOutput::from_slice(SAMPLE.as_bytes()).unwrap();
        let mut rec = record("10.0.0.7", 10);
        rec.apply_report(&output.report);

        assert_eq!(rec.status, ProbeStatus::Ok);
        assert_eq!(rec.packets_received, 8);
        assert_eq!(rec.rtt_mean, 1.234);
        assert_eq!(rec.rtt_min, 0.9);
        assert_eq!(rec.rtt_max, 2.5);
        assert_eq!(rec.rtt_deviation, 0.333);
        assert_eq!(rec.hop_count, 2);
    }

    #[test]
    fn test_apply_report_rounds_lost_packets() {
        let report = MtrReport {
            hops: vec![MtrHop {
                host: "10.0.0.7".to_string(),
                loss: 33.3,
                ..Default::default()
            }],
        };
        let mut rec = record("10.0.0.7", 5);
        rec.apply_report(&report);
        // 5 * 0.333 = 1.665 -> 2 lost
        assert_eq!(rec.packets_received, 3);
    }

    #[test]
    fn test_apply_report_no_match_keeps_defaults() {
        let output = MtrOutput::from_slice(SAMPLE.as_bytes()).unwrap();
        let mut rec = record("10.0.0.99", 10);
        rec.apply_report(&output.report);

        assert_eq!(rec.status, ProbeStatus::Unreachable);
        assert_eq!(rec.packets_received, 0);
        assert_eq!(rec.rtt_mean, 0.0);
        assert_eq!(rec.rtt_max, 0.0);
        assert_eq!(rec.hop_count, 2);
    }

    #[test]
    fn test_apply_report_empty_hops() {
        let mut rec = record("10.0.0.7", 10);
        rec.apply_report(&MtrReport::default());
        assert_eq!(rec.status, ProbeStatus::Unreachable);
        assert_eq!(rec.hop_count, 0);
    }

    #[test]
    fn test_status_values() {
        assert_eq!(ProbeStatus::Ok.as_f64(), 0.0);
        assert_eq!(ProbeStatus::Unreachable.as_f64(), 1.0);
        assert_eq!(ProbeStatus::default(), ProbeStatus::Unreachable);
    }
}
