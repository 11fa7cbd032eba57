//! Discovery Layer
//!
//! Turns cluster nodes into probe targets and keeps them current.
//!
//! - [`NodeSource`]: lists and watches cluster nodes ([`FileNodeSource`] ships here)
//! - [`Discovery`]: builds a [`TargetRegistry`] from the node list, excluding the local node
//! - [`NodeWatcher`]: rebuilds the registry on every topology event

mod file;
mod source;
mod watcher;

use std::collections::HashSet;
use std::sync::Arc;

pub use file::FileNodeSource;
pub use source::{DiscoveryError, Node, NodeEvent, NodeEventKind, NodeSource};
pub use watcher::NodeWatcher;

use crate::target::{Target, TargetRegistry};

/// Builds targets from the nodes of a [`NodeSource`].
#[derive(Clone)]
pub struct Discovery {
    source: Arc<dyn NodeSource>,
    node_name: String,
}

impl Discovery {
    /// `node_name` identifies the local node, which is never a target.
    pub fn new(source: Arc<dyn NodeSource>, node_name: impl Into<String>) -> Self {
        Self {
            source,
            node_name: node_name.into(),
        }
    }

    pub fn source(&self) -> &Arc<dyn NodeSource> {
        &self.source
    }

    /// List nodes and build a validated target registry.
    ///
    /// Nodes without an internal IP are skipped. The local node is excluded
    /// by name, and any other node reporting one of its addresses as well.
    pub async fn discover(&self) -> Result<TargetRegistry, DiscoveryError> {
        tracing::debug!("Discovering cluster nodes as probe targets");
        let nodes = self.source.list_nodes().await?;

        let self_addresses: HashSet<&str> = nodes
            .iter()
            .filter(|n| self.is_self(n))
            .filter_map(|n| n.internal_ip.as_deref())
            .collect();

        let mut targets = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let Some(address) = node.internal_ip.as_deref().filter(|a| !a.is_empty()) else {
                continue;
            };
            if self.is_self(node) || self_addresses.contains(address) {
                tracing::debug!(node = %node.name, address = %address, "Skip current node");
                continue;
            }
            let target = Target::new(address, node.display_name());
            tracing::debug!(
                ip_address = %target.address,
                name = %target.name,
                "Discovered node"
            );
            targets.push(target);
        }

        Ok(TargetRegistry::validated(targets))
    }

    fn is_self(&self, node: &Node) -> bool {
        node.display_name() == self.node_name || node.name == self.node_name
    }
}

impl std::fmt::Debug for Discovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovery")
            .field("node_name", &self.node_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct StaticSource(Vec<Node>);

    #[async_trait::async_trait]
    impl NodeSource for StaticSource {
        async fn list_nodes(&self) -> Result<Vec<Node>, DiscoveryError> {
            Ok(self.0.clone())
        }

        async fn watch(&self) -> Result<mpsc::Receiver<NodeEvent>, DiscoveryError> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }
    }

    fn discovery(nodes: Vec<Node>, node_name: &str) -> Discovery {
        Discovery::new(Arc::new(StaticSource(nodes)), node_name)
    }

    #[tokio::test]
    async fn test_discover_excludes_self() {
        let discovery = discovery(
            vec![
                Node::new("node-a")
                    .with_internal_ip("10.0.0.1")
                    .with_hostname("node-a"),
                Node::new("node-b")
                    .with_internal_ip("10.0.0.2")
                    .with_hostname("node-b"),
                Node::new("node-c").with_hostname("node-c"),
            ],
            "node-a",
        );

        let targets = discovery.discover().await.unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0], Target::new("10.0.0.2", "node-b"));
    }

    #[tokio::test]
    async fn test_discover_excludes_self_address() {
        // A second entry for the local node under another name.
        let discovery = discovery(
            vec![
                Node::new("node-a").with_internal_ip("10.0.0.1"),
                Node::new("node-a-alias").with_internal_ip("10.0.0.1"),
                Node::new("node-b").with_internal_ip("10.0.0.2"),
            ],
            "node-a",
        );

        let targets = discovery.discover().await.unwrap();
        let addresses: Vec<&str> = targets.iter().map(|t| t.address.as_str()).collect();
        assert_eq!(addresses, vec!["10.0.0.2"]);
    }

    #[tokio::test]
    async fn test_discover_drops_invalid_addresses() {
        let discovery = discovery(
            vec![
                Node::new("node-b").with_internal_ip("10.0.0.2"),
                Node::new("node-c").with_internal_ip("not-an-ip"),
                Node::new("node-d").with_internal_ip(""),
            ],
            "localhost",
        );

        let targets = discovery.discover().await.unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].name, "node-b");
    }
}
