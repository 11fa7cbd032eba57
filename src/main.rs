//! Network Latency Exporter Binary Entry Point
//!
//! This binary runs the exporter: it discovers cluster nodes, probes them
//! with `mtr` on every scrape and serves the results.
//! Core functionality is provided by the `network_latency_exporter` library crate.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser, builder::BoolishValueParser};
use network_latency_exporter::{
    collector::{CollectorKind, CollectorRegistry, ConfigContainer, InitParams, NodeCollector},
    config::AppConfig,
    discovery::{Discovery, FileNodeSource, NodeSource, NodeWatcher},
    metrics::{self, LatencyMetrics},
    probe::{MtrRunner, ProbeExecutor, parse_probe_specs},
    server::{AppState, create_router},
    target::TargetRegistry,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound on waiting for in-flight requests at shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Network Latency Exporter - node-to-node latency as Prometheus metrics
#[derive(Parser, Debug)]
#[command(name = "network-latency-exporter", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "EXPORTER_CONFIG")]
    config: Option<PathBuf>,

    /// Server bind address (overrides config file)
    #[arg(long, env = "EXPORTER_SERVER_BIND")]
    server_bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "EXPORTER_SERVER_PORT")]
    server_port: Option<u16>,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path")]
    telemetry_path: Option<String>,

    /// Maximum number of parallel scrape requests, 0 to disable
    #[arg(long = "web.max-requests")]
    max_requests: Option<usize>,

    /// Log filter, e.g. `info` or `network_latency_exporter=debug`
    #[arg(long = "log.level", env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Packets sent per probe
    #[arg(long, env = "PACKETS_NUM")]
    packets_num: Option<u32>,

    /// Packet size in bytes
    #[arg(long, env = "PACKET_SIZE")]
    packet_size: Option<u32>,

    /// Per-packet timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT")]
    request_timeout: Option<u32>,

    /// Probes to run against each target, e.g. `ICMP,TCP:80,UDP:53`
    #[arg(long, env = "CHECK_TARGET")]
    check_target: Option<String>,

    /// Extra seconds added to each probe deadline
    #[arg(long, env = "MTR_TIMEOUT")]
    mtr_timeout: Option<u64>,

    /// Path or name of the mtr binary
    #[arg(long, env = "MTR_PROGRAM")]
    mtr_program: Option<PathBuf>,

    /// Enabled collector kinds, comma separated
    #[arg(long, env = "LATENCY_TYPES")]
    latency_types: Option<String>,

    /// Name of the local node
    #[arg(long, env = "NODE_NAME")]
    node_name: Option<String>,

    /// Discover targets from the node inventory
    #[arg(
        long,
        env = "DISCOVER_ENABLE",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    discover_enable: Option<bool>,

    /// YAML node inventory used for discovery
    #[arg(long, env = "NODES_FILE")]
    nodes_file: Option<PathBuf>,

    /// Prefix of the latency metric names
    #[arg(long, env = "METRIC_PREFIX")]
    metric_prefix: Option<String>,
}

impl Cli {
    /// Apply CLI/env overrides (CLI > ENV > config file).
    fn apply(self, config: &mut AppConfig) {
        if let Some(bind) = self.server_bind {
            config.server.bind = bind;
        }
        if let Some(port) = self.server_port {
            config.server.port = port;
        }
        if let Some(path) = self.telemetry_path {
            config.server.metrics_path = path;
        }
        if let Some(max) = self.max_requests {
            config.server.max_requests = max;
        }
        if let Some(packets) = self.packets_num {
            config.probe.packets = packets;
        }
        if let Some(size) = self.packet_size {
            config.probe.packet_size = size;
        }
        if let Some(timeout) = self.request_timeout {
            config.probe.request_timeout = timeout;
        }
        if let Some(check_target) = self.check_target {
            config.probe.check_target = check_target;
        }
        if let Some(secs) = self.mtr_timeout {
            config.probe.mtr_timeout = Duration::from_secs(secs);
        }
        if let Some(program) = self.mtr_program {
            config.probe.program = program;
        }
        if let Some(types) = self.latency_types {
            config.latency_types = types;
        }
        if let Some(name) = self.node_name {
            config.discovery.node_name = name;
        }
        if let Some(enabled) = self.discover_enable {
            config.discovery.enabled = enabled;
        }
        if let Some(path) = self.nodes_file {
            config.discovery.nodes_file = Some(path);
        }
        if let Some(prefix) = self.metric_prefix {
            config.metric_prefix = prefix;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.log_level.take() {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info,network_latency_exporter=debug".into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Network Latency Exporter");

    // Load configuration from file
    let mut config = match cli.config.take() {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading configuration");
            AppConfig::load(&path)?
        }
        None => AppConfig::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    tracing::info!(
        bind = %config.server.bind,
        port = config.server.port,
        metrics_path = %config.server.metrics_path,
        packets = config.probe.packets,
        packet_size = config.probe.packet_size,
        request_timeout = config.probe.request_timeout,
        check_target = %config.probe.check_target,
        node_name = %config.discovery.node_name,
        "Configuration loaded"
    );

    let probe_specs = parse_probe_specs(&config.probe.check_target);
    if probe_specs.is_empty() {
        tracing::warn!(check_target = %config.probe.check_target, "No usable probes configured");
    }

    // Keep only recognized collector kinds
    let kinds: Vec<String> = config
        .latency_type_names()
        .into_iter()
        .filter(|name| {
            let known = CollectorKind::from_str(name).is_ok();
            if !known {
                tracing::error!(collector = %name, "Unknown collector kind, skipping");
            }
            known
        })
        .collect();
    if kinds.is_empty() {
        return Err(format!("no usable collector kinds in '{}'", config.latency_types).into());
    }

    // Resolve the initial targets
    let discovery = if config.discovery.enabled {
        let path = config
            .discovery
            .nodes_file
            .clone()
            .ok_or("discovery is enabled but no nodes file is configured")?;
        let source: Arc<dyn NodeSource> = Arc::new(FileNodeSource::new(
            path,
            config.discovery.sync_interval,
        ));
        Some(Discovery::new(source, &config.discovery.node_name))
    } else {
        tracing::info!("Discovery is disabled, using static targets");
        None
    };
    let targets = match &discovery {
        Some(discovery) => discovery.discover().await?,
        None => TargetRegistry::validated(config.targets.clone()),
    };
    tracing::info!(targets = targets.len(), probes = probe_specs.len(), "Targets resolved");

    // Build the per-kind configuration
    let container = Arc::new(ConfigContainer::new());
    container
        .initialize_once(InitParams {
            packets_sent: config.probe.packets.to_string(),
            packet_size: config.probe.packet_size.to_string(),
            probe_timeout: config.probe.request_timeout.to_string(),
            probe_specs,
            targets,
            metrics_path: config.server.metrics_path.clone(),
            kinds,
        })
        .await?;

    // Register scrape counters, build info, process metrics and collectors
    let registry = CollectorRegistry::new(prometheus::Registry::new())?;
    metrics::register_with_retry(
        registry.registry(),
        &metrics::build_info(env!("CARGO_PKG_VERSION"))?,
    )?;
    metrics::register_process_collector(registry.registry())?;

    let executor = ProbeExecutor::new(Arc::new(MtrRunner::new(config.probe.program.clone())))
        .with_extra_timeout(config.probe.mtr_timeout);
    let latency_metrics = LatencyMetrics::new(config.discovery.node_name.clone())
        .with_prefix(config.metric_prefix.clone());

    for kind in container.configured_kinds().await {
        match kind {
            CollectorKind::NodeCollector => {
                registry
                    .register(NodeCollector::new(
                        Arc::clone(&container),
                        executor.clone(),
                        latency_metrics.clone(),
                    ))
                    .await;
                tracing::info!(collector = %kind, "Collector enabled");
            }
            CollectorKind::PodCollector => {
                tracing::warn!(collector = %kind, "Collector has no executor, skipping");
            }
        }
    }
    let registry = Arc::new(registry);

    // Watch for topology changes
    let watcher = match discovery {
        Some(discovery) => {
            let events = discovery.source().watch().await?;
            let watcher = NodeWatcher::new(discovery, Arc::clone(&container));
            Some(tokio::spawn(watcher.run(events)))
        }
        None => None,
    };

    // Build Axum router
    let state = AppState::new(Arc::clone(&registry), config.server.max_requests)?;
    let app = create_router(state, &config.server.metrics_path);

    // Parse bind address
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    tracing::info!("Web server listening on: http://{}", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let stopping = Arc::new(tokio::sync::Notify::new());
    let serve = axum::serve(listener, app).with_graceful_shutdown({
        let stopping = Arc::clone(&stopping);
        async move {
            shutdown_signal().await;
            stopping.notify_one();
        }
    });

    tokio::select! {
        result = async move { serve.await } => result?,
        _ = async {
            stopping.notified().await;
            tokio::time::sleep(SHUTDOWN_TIMEOUT).await;
        } => {
            tracing::warn!(timeout = ?SHUTDOWN_TIMEOUT, "Graceful shutdown timed out, forcing close");
        }
    }

    if let Some(watcher) = watcher {
        watcher.abort();
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Setup graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }

    tracing::info!(timeout = ?SHUTDOWN_TIMEOUT, "Shutting down server gracefully");
}
