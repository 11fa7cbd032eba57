//! Execution of the external diagnostic tool.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

/// Default program name of the diagnostic tool.
pub const DEFAULT_MTR_PROGRAM: &str = "mtr";

/// Errors from a single probe.
///
/// All of them are local to one probe: the destination is reported as
/// unreachable and the scrape goes on.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The process could not be started.
    #[error("failed to run mtr process: {0}")]
    Spawn(#[from] std::io::Error),

    /// The process finished with a non-zero status.
    #[error("mtr exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },

    /// The deadline elapsed; the process has been killed.
    #[error("process timeout after {0:?}")]
    Timeout(Duration),

    /// The output was not a valid JSON report.
    #[error("error while unmarshalling mtr output: {0}")]
    Parse(#[from] serde_json::Error),

    /// The probe task panicked or was cancelled.
    #[error("probe task failed: {0}")]
    Task(String),
}

/// Arguments of one probe, in the order the tool expects them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeArgs {
    /// Per-packet timeout in seconds, passed to both `-G` and `-Z`.
    pub probe_timeout: String,
    pub packet_size: String,
    pub packets_sent: String,
    /// Protocol flag, empty for ICMP.
    pub protocol_flag: &'static str,
    pub port: String,
    pub address: String,
}

impl ProbeArgs {
    /// Render the command line arguments.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "-G".to_string(), // wait for a probe response
            self.probe_timeout.clone(),
            "-Z".to_string(), // keep the probe socket open
            self.probe_timeout.clone(),
            "-n".to_string(),
            "--json".to_string(),
            "-s".to_string(),
            self.packet_size.clone(),
            "-c".to_string(),
            self.packets_sent.clone(),
            self.protocol_flag.to_string(),
            "-P".to_string(),
            self.port.clone(),
            self.address.clone(),
        ]
    }
}

/// Runs one probe and returns the raw report printed on stdout.
///
/// The caller bounds every run with a deadline by dropping the future, so
/// implementations must release their resources on drop.
#[async_trait::async_trait]
pub trait ProbeRunner: Send + Sync + 'static {
    async fn run(&self, args: &ProbeArgs) -> Result<Vec<u8>, ProbeError>;
}

/// [`ProbeRunner`] spawning the `mtr` binary.
#[derive(Debug, Clone)]
pub struct MtrRunner {
    program: PathBuf,
}

impl MtrRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for MtrRunner {
    fn default() -> Self {
        Self::new(DEFAULT_MTR_PROGRAM)
    }
}

#[async_trait::async_trait]
impl ProbeRunner for MtrRunner {
    async fn run(&self, args: &ProbeArgs) -> Result<Vec<u8>, ProbeError> {
        let output = Command::new(&self.program)
            .args(args.to_args())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ProbeError::Exit {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}
