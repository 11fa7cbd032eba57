//! Node source abstraction.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised while listing or watching cluster nodes.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Failed to read the node inventory.
    #[error("failed to read node inventory {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the node inventory.
    #[error("failed to parse node inventory: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The watch could not be established.
    #[error("failed to watch nodes: {0}")]
    Watch(String),
}

/// A cluster node as reported by a [`NodeSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Object name of the node.
    pub name: String,
    /// Internal IP address; nodes without one are never probed.
    #[serde(rename = "internalIP", default)]
    pub internal_ip: Option<String>,
    /// Host name address.
    #[serde(default)]
    pub hostname: Option<String>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            internal_ip: None,
            hostname: None,
        }
    }

    pub fn with_internal_ip(mut self, ip: impl Into<String>) -> Self {
        self.internal_ip = Some(ip.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Host name, falling back to the object name.
    pub fn display_name(&self) -> &str {
        self.hostname.as_deref().unwrap_or(&self.name)
    }
}

/// Kind of a node change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum NodeEventKind {
    Added,
    Modified,
    Deleted,
    /// Progress marker without a topology change.
    Bookmark,
}

impl NodeEventKind {
    /// Whether the event changes the set of targets.
    pub fn is_topology_change(&self) -> bool {
        matches!(self, Self::Added | Self::Modified | Self::Deleted)
    }
}

/// One change reported by [`NodeSource::watch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEvent {
    pub kind: NodeEventKind,
    pub node: Node,
}

impl NodeEvent {
    pub fn new(kind: NodeEventKind, node: Node) -> Self {
        Self { kind, node }
    }
}

/// Source of cluster nodes.
#[async_trait::async_trait]
pub trait NodeSource: Send + Sync + 'static {
    /// Current list of nodes.
    async fn list_nodes(&self) -> Result<Vec<Node>, DiscoveryError>;

    /// Subscribe to node changes. The stream ends when the source stops.
    async fn watch(&self) -> Result<mpsc::Receiver<NodeEvent>, DiscoveryError>;
}
