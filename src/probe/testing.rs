//! In-process runner used by unit tests in place of the external tool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::runner::{ProbeArgs, ProbeError, ProbeRunner};

#[derive(Debug, Clone)]
pub(crate) enum StaticReply {
    /// Raw JSON output.
    Json(String),
    /// The tool could not be run.
    Fail,
}

/// Replies per destination address; unknown addresses get an empty report.
#[derive(Debug, Default)]
pub(crate) struct StaticRunner {
    replies: HashMap<String, StaticReply>,
    calls: AtomicUsize,
}

impl StaticRunner {
    pub(crate) fn reply(mut self, address: &str, reply: StaticReply) -> Self {
        self.replies.insert(address.to_string(), reply);
        self
    }

    /// Reply with a single-hop report whose host is `address`.
    pub(crate) fn reachable(self, address: &str, loss: f64) -> Self {
        let json = format!(
            r#"{{"report": {{"hubs": [{{"host": "{address}", "Loss%": {loss}, "Snt": 5, "Avg": 1.5, "Best": 1.0, "Wrst": 2.0, "StDev": 0.2}}]}}}}"#
        );
        self.reply(address, StaticReply::Json(json))
    }

    pub(crate) fn fail(self, address: &str) -> Self {
        self.reply(address, StaticReply::Fail)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProbeRunner for StaticRunner {
    async fn run(&self, args: &ProbeArgs) -> Result<Vec<u8>, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.get(&args.address) {
            Some(StaticReply::Json(json)) => Ok(json.clone().into_bytes()),
            Some(StaticReply::Fail) => Err(ProbeError::Spawn(std::io::Error::other(
                "exit status: 1",
            ))),
            None => Ok(br#"{"report": {"hubs": []}}"#.to_vec()),
        }
    }
}
