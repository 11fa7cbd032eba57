//! Node watcher: rebuilds the target registry on topology changes.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::Discovery;
use super::source::NodeEvent;
use crate::collector::ConfigContainer;

/// Consumes node events and swaps the targets of every collector kind.
#[derive(Debug)]
pub struct NodeWatcher {
    discovery: Discovery,
    container: Arc<ConfigContainer>,
}

impl NodeWatcher {
    pub fn new(discovery: Discovery, container: Arc<ConfigContainer>) -> Self {
        Self {
            discovery,
            container,
        }
    }

    /// Process events until the stream ends.
    pub async fn run(self, mut events: mpsc::Receiver<NodeEvent>) {
        while let Some(event) = events.recv().await {
            tracing::info!(
                event = %event.kind,
                node = %event.node.name,
                "Node event occurred"
            );
            if !event.kind.is_topology_change() {
                continue;
            }

            match self.discovery.discover().await {
                Ok(targets) => {
                    tracing::info!(targets = targets.len(), "Targets rediscovered");
                    self.container.replace_targets(targets).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Discovery failed, keeping previous targets");
                }
            }
        }
        tracing::info!("Node watch stream closed");
    }
}
