//! File-backed node source.
//!
//! Reads a YAML node inventory and polls it for changes:
//!
//! ```yaml
//! nodes:
//!   - name: worker-1
//!     internalIP: 10.0.0.11
//!     hostname: worker-1
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;

use super::source::{DiscoveryError, Node, NodeEvent, NodeEventKind, NodeSource};

/// Capacity of the watch channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Default, Deserialize)]
struct Inventory {
    #[serde(default)]
    nodes: Vec<Node>,
}

/// Node source reading a YAML inventory file.
#[derive(Debug, Clone)]
pub struct FileNodeSource {
    path: PathBuf,
    interval: Duration,
}

impl FileNodeSource {
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
        }
    }

    async fn read(&self) -> Result<String, DiscoveryError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| DiscoveryError::Read {
                path: self.path.clone(),
                source,
            })
    }
}

fn parse_inventory(content: &str) -> Result<Vec<Node>, DiscoveryError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let inventory: Inventory = serde_yaml::from_str(content)?;
    Ok(inventory.nodes)
}

fn index(nodes: Vec<Node>) -> BTreeMap<String, Node> {
    nodes.into_iter().map(|n| (n.name.clone(), n)).collect()
}

/// Compare two inventories by node name.
fn diff(previous: &BTreeMap<String, Node>, current: &BTreeMap<String, Node>) -> Vec<NodeEvent> {
    let mut events = Vec::new();
    for (name, node) in current {
        match previous.get(name) {
            None => events.push(NodeEvent::new(NodeEventKind::Added, node.clone())),
            Some(old) if old != node => {
                events.push(NodeEvent::new(NodeEventKind::Modified, node.clone()))
            }
            Some(_) => {}
        }
    }
    for (name, node) in previous {
        if !current.contains_key(name) {
            events.push(NodeEvent::new(NodeEventKind::Deleted, node.clone()));
        }
    }
    events
}

#[async_trait::async_trait]
impl NodeSource for FileNodeSource {
    async fn list_nodes(&self) -> Result<Vec<Node>, DiscoveryError> {
        parse_inventory(&self.read().await?)
    }

    async fn watch(&self) -> Result<mpsc::Receiver<NodeEvent>, DiscoveryError> {
        let mut last_content = self.read().await?;
        let mut known = index(parse_inventory(&last_content)?);

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let source = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(source.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }

                let content = match source.read().await {
                    Ok(content) => content,
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "Failed to read node inventory, keeping previous state"
                        );
                        continue;
                    }
                };
                if content == last_content {
                    continue;
                }
                let current = match parse_inventory(&content) {
                    Ok(nodes) => index(nodes),
                    Err(e) => {
                        tracing::warn!(
                            path = %source.path.display(),
                            error = %e,
                            "Invalid node inventory, keeping previous state"
                        );
                        continue;
                    }
                };

                let mut events = diff(&known, &current);
                if events.is_empty() {
                    events.push(NodeEvent::new(NodeEventKind::Bookmark, Node::new("")));
                }
                last_content = content;
                known = current;

                for event in events {
                    if tx.send(event).await.is_err() {
                        tracing::debug!("Node watch receiver dropped");
                        return;
                    }
                }
            }
        });

        tracing::info!(
            path = %self.path.display(),
            interval = ?self.interval,
            "Watching node inventory"
        );
        Ok(rx)
    }
}
