//! Probe Layer
//!
//! Everything needed to turn one configuration snapshot into latency records:
//!
//! - [`ProbeSpec`]: protocol/port pairs parsed from `ICMP,TCP:80,...`
//! - [`ProbeRunner`]: the external diagnostic tool ([`MtrRunner`] in production)
//! - [`ProbeExecutor`]: concurrent fan-out over targets x specs with per-probe deadlines
//! - [`LatencyRecord`]: the classified result of one probe

mod executor;
mod report;
mod runner;
mod spec;
#[cfg(test)]
pub(crate) mod testing;

pub use executor::{DEFAULT_EXTRA_TIMEOUT, ProbeBatch, ProbeConfig, ProbeExecutor};
pub use report::{LatencyRecord, MtrHop, MtrOutput, MtrReport, ProbeStatus};
pub use runner::{DEFAULT_MTR_PROGRAM, MtrRunner, ProbeArgs, ProbeError, ProbeRunner};
pub use spec::{DEFAULT_PORT, ProbeSpec, ProbeSpecs, Protocol, parse_probe_specs};
