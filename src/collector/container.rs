//! Per-kind probe configuration shared between scrapes and discovery.

use std::collections::HashMap;
use std::str::FromStr;

use tokio::sync::RwLock;

use crate::collector::{CollectorError, CollectorKind};
use crate::probe::{ProbeConfig, ProbeSpecs};
use crate::target::TargetRegistry;

/// Configuration of one collector kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorConfig {
    Node(ProbeConfig),
    Pod(ProbeConfig),
}

impl CollectorConfig {
    fn build(kind: CollectorKind, probe: ProbeConfig) -> Self {
        match kind {
            CollectorKind::NodeCollector => Self::Node(probe),
            CollectorKind::PodCollector => Self::Pod(probe),
        }
    }

    pub fn kind(&self) -> CollectorKind {
        match self {
            Self::Node(_) => CollectorKind::NodeCollector,
            Self::Pod(_) => CollectorKind::PodCollector,
        }
    }

    pub fn probe(&self) -> &ProbeConfig {
        match self {
            Self::Node(probe) | Self::Pod(probe) => probe,
        }
    }

    fn probe_mut(&mut self) -> &mut ProbeConfig {
        match self {
            Self::Node(probe) | Self::Pod(probe) => probe,
        }
    }

    pub fn into_probe(self) -> ProbeConfig {
        match self {
            Self::Node(probe) | Self::Pod(probe) => probe,
        }
    }
}

/// Inputs of [`ConfigContainer::initialize_once`].
#[derive(Debug, Clone)]
pub struct InitParams {
    pub packets_sent: String,
    pub packet_size: String,
    pub probe_timeout: String,
    pub probe_specs: ProbeSpecs,
    pub targets: TargetRegistry,
    pub metrics_path: String,
    /// Collector kind names, e.g. `node_collector`.
    pub kinds: Vec<String>,
}

impl InitParams {
    fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            packets_sent: self.packets_sent.clone(),
            packet_size: self.packet_size.clone(),
            probe_timeout: self.probe_timeout.clone(),
            probe_specs: self.probe_specs.clone(),
            targets: self.targets.clone(),
            metrics_path: self.metrics_path.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct ContainerState {
    initialized: bool,
    configs: HashMap<CollectorKind, CollectorConfig>,
}

/// Holds the live configuration of every enabled collector kind.
///
/// Scrapes take cloned snapshots under the read lock; discovery swaps the
/// target registry of every kind under the write lock.
#[derive(Debug, Default)]
pub struct ConfigContainer {
    state: RwLock<ContainerState>,
}

impl ConfigContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the per-kind configuration. Only the first successful call has
    /// an effect; later calls return `Ok(())` without touching the state.
    ///
    /// # Errors
    /// Returns `CollectorError::Config` if a kind name is not recognized.
    pub async fn initialize_once(&self, params: InitParams) -> Result<(), CollectorError> {
        let mut state = self.state.write().await;
        if state.initialized {
            tracing::debug!("Config container already initialized");
            return Ok(());
        }

        let mut configs = HashMap::with_capacity(params.kinds.len());
        for name in &params.kinds {
            let kind = CollectorKind::from_str(name.trim()).map_err(|_| {
                CollectorError::Config(format!("unknown collector kind '{name}'"))
            })?;
            configs.insert(kind, CollectorConfig::build(kind, params.probe_config()));
        }

        tracing::info!(
            kinds = ?configs.keys().collect::<Vec<_>>(),
            targets = params.targets.len(),
            probe_specs = params.probe_specs.len(),
            "Config container initialized"
        );
        state.configs = configs;
        state.initialized = true;
        Ok(())
    }

    /// Replace the target registry of every configured kind.
    pub async fn replace_targets(&self, targets: TargetRegistry) {
        let mut state = self.state.write().await;
        for config in state.configs.values_mut() {
            config.probe_mut().targets = targets.clone();
        }
        tracing::debug!(targets = targets.len(), "Target registry replaced");
    }

    /// Snapshot of a kind's configuration.
    pub async fn get_config(&self, kind: CollectorKind) -> Option<CollectorConfig> {
        self.state.read().await.configs.get(&kind).cloned()
    }

    /// Kinds present after initialization, sorted.
    pub async fn configured_kinds(&self) -> Vec<CollectorKind> {
        let mut kinds: Vec<CollectorKind> =
            self.state.read().await.configs.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::parse_probe_specs;
    use crate::target::Target;

    fn params(kinds: &[&str], targets: Vec<Target>) -> InitParams {
        InitParams {
            packets_sent: "10".to_string(),
            packet_size: "1500".to_string(),
            probe_timeout: "3".to_string(),
            probe_specs: parse_probe_specs("ICMP,TCP:80"),
            targets: TargetRegistry::new(targets),
            metrics_path: "/metrics".to_string(),
            kinds: kinds.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_initialize_once() {
        let container = ConfigContainer::new();
        container
            .initialize_once(params(
                &["node_collector"],
                vec![Target::new("10.0.0.1", "a")],
            ))
            .await
            .unwrap();

        // Second call is a no-op, even with different inputs.
        container
            .initialize_once(params(
                &["node_collector", "pod_collector"],
                vec![Target::new("10.0.0.9", "z")],
            ))
            .await
            .unwrap();

        assert_eq!(
            container.configured_kinds().await,
            vec![CollectorKind::NodeCollector]
        );
        let config = container
            .get_config(CollectorKind::NodeCollector)
            .await
            .unwrap();
        assert_eq!(config.kind(), CollectorKind::NodeCollector);
        assert_eq!(config.probe().targets[0].address, "10.0.0.1");
        assert_eq!(config.probe().probe_specs.len(), 2);
        assert!(container.get_config(CollectorKind::PodCollector).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let container = ConfigContainer::new();
        let err = container
            .initialize_once(params(&["node_collector", "service_collector"], vec![]))
            .await
            .unwrap_err();

        assert!(matches!(err, CollectorError::Config(_)));
        assert!(err.to_string().contains("service_collector"));
        assert!(!container.is_initialized().await);
        assert!(container.configured_kinds().await.is_empty());
    }

    #[tokio::test]
    async fn test_both_kinds() {
        let container = ConfigContainer::new();
        container
            .initialize_once(params(&["pod_collector", "node_collector"], vec![]))
            .await
            .unwrap();

        assert_eq!(
            container.configured_kinds().await,
            vec![CollectorKind::NodeCollector, CollectorKind::PodCollector]
        );
        let pod = container
            .get_config(CollectorKind::PodCollector)
            .await
            .unwrap();
        assert!(matches!(pod, CollectorConfig::Pod(_)));
    }

    #[tokio::test]
    async fn test_snapshot_isolation() {
        let container = ConfigContainer::new();
        container
            .initialize_once(params(
                &["node_collector", "pod_collector"],
                vec![Target::new("10.0.0.1", "a"), Target::new("10.0.0.2", "b")],
            ))
            .await
            .unwrap();

        let snapshot = container
            .get_config(CollectorKind::NodeCollector)
            .await
            .unwrap()
            .into_probe();

        container
            .replace_targets(TargetRegistry::new(vec![Target::new("10.0.0.3", "c")]))
            .await;

        // The snapshot keeps the old registry in full.
        assert_eq!(snapshot.targets.len(), 2);
        assert_eq!(snapshot.targets[1].address, "10.0.0.2");

        // Every kind sees the new registry.
        for kind in [CollectorKind::NodeCollector, CollectorKind::PodCollector] {
            let config = container.get_config(kind).await.unwrap();
            assert_eq!(config.probe().targets.len(), 1);
            assert_eq!(config.probe().targets[0].address, "10.0.0.3");
        }
    }
}
