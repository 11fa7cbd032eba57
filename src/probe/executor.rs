//! Concurrent execution of one scrape's probes.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout};

use super::report::{LatencyRecord, MtrOutput};
use super::runner::{ProbeArgs, ProbeError, ProbeRunner};
use super::spec::{ProbeSpec, ProbeSpecs};
use crate::target::{Target, TargetRegistry};

/// Default budget added to the packet count when computing a probe deadline.
pub const DEFAULT_EXTRA_TIMEOUT: Duration = Duration::from_secs(10);

/// Probe parameters for one collector kind.
///
/// Scalars are kept as the strings handed to the tool; they are only parsed
/// where a number is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Packets sent per probe (`mtr -c`).
    pub packets_sent: String,
    /// Packet size in bytes (`mtr -s`).
    pub packet_size: String,
    /// Per-packet timeout in seconds (`mtr -G` and `-Z`).
    pub probe_timeout: String,
    pub probe_specs: ProbeSpecs,
    pub targets: TargetRegistry,
    pub metrics_path: String,
}

impl ProbeConfig {
    /// Number of probes one scrape launches.
    pub fn probe_count(&self) -> usize {
        self.targets.len() * self.probe_specs.len()
    }

    /// Packet count as a number, 0 when it does not parse.
    pub fn packets_sent_count(&self) -> i64 {
        match self.packets_sent.trim().parse::<i64>() {
            Ok(packets) => packets,
            Err(e) => {
                tracing::error!(
                    packets_sent = %self.packets_sent,
                    error = %e,
                    "Packets sent has incorrect value"
                );
                0
            }
        }
    }
}

/// Records of one scrape plus the number of probes that failed.
#[derive(Debug, Default)]
pub struct ProbeBatch {
    pub records: Vec<LatencyRecord>,
    pub failures: usize,
}

impl ProbeBatch {
    pub fn has_failures(&self) -> bool {
        self.failures > 0
    }
}

/// Runs the full target x probe-spec cross product of a configuration.
#[derive(Clone)]
pub struct ProbeExecutor {
    runner: Arc<dyn ProbeRunner>,
    extra_timeout: Duration,
}

impl ProbeExecutor {
    pub fn new(runner: Arc<dyn ProbeRunner>) -> Self {
        Self {
            runner,
            extra_timeout: DEFAULT_EXTRA_TIMEOUT,
        }
    }

    /// Set the budget added on top of one second per packet.
    pub fn with_extra_timeout(mut self, extra_timeout: Duration) -> Self {
        self.extra_timeout = extra_timeout;
        self
    }

    /// Deadline of each probe: one second per packet plus the extra budget.
    pub fn probe_deadline(&self, packets_sent: i64) -> Duration {
        let packets = u64::try_from(packets_sent).unwrap_or(0);
        Duration::from_secs(packets) + self.extra_timeout
    }

    /// Run every probe of `config` concurrently and wait for all of them.
    ///
    /// `scrape_deadline` is the caller's hint for the whole scrape; probe
    /// deadlines never extend past it.
    pub async fn execute(
        &self,
        config: &ProbeConfig,
        scrape_deadline: Option<Instant>,
    ) -> ProbeBatch {
        let packets_sent = config.packets_sent_count();
        let probe_deadline = self.probe_deadline(packets_sent);

        let mut pending = Vec::with_capacity(config.probe_count());
        for target in config.targets.iter() {
            for spec in config.probe_specs.iter() {
                let fallback = LatencyRecord::unreachable(target, spec, packets_sent);
                let args = probe_args(config, target, spec);
                let deadline = clamp_deadline(probe_deadline, scrape_deadline);

                tracing::debug!(
                    target_name = %target.name,
                    target_address = %target.address,
                    probe = %spec,
                    "Execute probe"
                );
                let handle = tokio::spawn(run_probe(
                    Arc::clone(&self.runner),
                    args,
                    fallback.clone(),
                    deadline,
                ));
                pending.push((fallback, handle));
            }
        }

        let mut batch = ProbeBatch {
            records: Vec::with_capacity(pending.len()),
            failures: 0,
        };
        for (fallback, handle) in pending {
            let (record, error) = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let err = ProbeError::Task(e.to_string());
                    tracing::error!(
                        target_address = %fallback.destination_address,
                        error = %err,
                        "Probe task did not complete"
                    );
                    (fallback, Some(err))
                }
            };
            if error.is_some() {
                batch.failures += 1;
            }
            batch.records.push(record);
        }
        batch
    }
}

impl std::fmt::Debug for ProbeExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeExecutor")
            .field("extra_timeout", &self.extra_timeout)
            .finish_non_exhaustive()
    }
}

fn probe_args(config: &ProbeConfig, target: &Target, spec: &ProbeSpec) -> ProbeArgs {
    ProbeArgs {
        probe_timeout: config.probe_timeout.clone(),
        packet_size: config.packet_size.clone(),
        packets_sent: config.packets_sent.clone(),
        protocol_flag: spec.tool_flag(),
        port: spec.port.clone(),
        address: target.address.clone(),
    }
}

fn clamp_deadline(probe_deadline: Duration, scrape_deadline: Option<Instant>) -> Duration {
    match scrape_deadline {
        Some(at) => probe_deadline.min(at.saturating_duration_since(Instant::now())),
        None => probe_deadline,
    }
}

/// Run one probe and fold its report into `record`.
///
/// Returns the record in every case, together with the error if the probe
/// failed.
async fn run_probe(
    runner: Arc<dyn ProbeRunner>,
    args: ProbeArgs,
    mut record: LatencyRecord,
    deadline: Duration,
) -> (LatencyRecord, Option<ProbeError>) {
    let start = Instant::now();

    let result = match timeout(deadline, runner.run(&args)).await {
        Ok(Ok(raw)) => MtrOutput::from_slice(&raw).map_err(ProbeError::from),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(ProbeError::Timeout(deadline)),
    };

    match result {
        Ok(output) => {
            record.apply_report(&output.report);
            tracing::debug!(
                target_address = %args.address,
                protocol = %record.protocol,
                port = %record.port,
                status = ?record.status,
                hops = record.hop_count,
                elapsed_ms = start.elapsed().as_millis(),
                "Probe finished"
            );
            (record, None)
        }
        Err(e) => {
            tracing::error!(
                target_address = %args.address,
                protocol = %record.protocol,
                port = %record.port,
                elapsed_ms = start.elapsed().as_millis(),
                error = %e,
                "Probe failed"
            );
            (record, Some(e))
        }
    }
}
