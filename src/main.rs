//! OpenShift State Metrics
//!
//! Exporter serving the state of OpenShift resources as Prometheus metrics.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   openshift-state-metrics                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐    ┌──────────────┐    ┌─────────────────┐   │
//! │  │ Reflectors │───▶│ MetricsStore │───▶│ /metrics server │   │
//! │  │ (per scope)│    │ (per type)   │    │ (scrape)        │   │
//! │  └────────────┘    └──────────────┘    └─────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use openshift_state_metrics::collectors::Builder;
use openshift_state_metrics::error::Result;
use openshift_state_metrics::metrics::ExporterMetrics;
use openshift_state_metrics::options::{split_list, ConfigFile, Options};
use openshift_state_metrics::server;
use openshift_state_metrics::sync::{create_client, KubeSourceFactory};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Export the state of OpenShift resources as Prometheus metrics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Comma-separated list of collectors to enable
    #[arg(long, env = "OSM_COLLECTORS")]
    collectors: Option<String>,

    /// Comma-separated list of namespaces to watch; empty for all namespaces
    #[arg(long, env = "OSM_NAMESPACES")]
    namespaces: Option<String>,

    /// Comma-separated list of metric families to export
    #[arg(long, env = "OSM_METRIC_WHITELIST")]
    metric_whitelist: Option<String>,

    /// Comma-separated list of metric families not to export
    #[arg(long, env = "OSM_METRIC_BLACKLIST")]
    metric_blacklist: Option<String>,

    /// Host to expose metrics on
    #[arg(long, env = "OSM_HOST")]
    host: Option<String>,

    /// Port to expose metrics on
    #[arg(long, env = "OSM_PORT")]
    port: Option<u16>,

    /// Host to expose exporter self metrics on
    #[arg(long, env = "OSM_TELEMETRY_HOST")]
    telemetry_host: Option<String>,

    /// Port to expose exporter self metrics on
    #[arg(long, env = "OSM_TELEMETRY_PORT")]
    telemetry_port: Option<u16>,

    /// URL of the API server; overrides the kubeconfig server
    #[arg(long, env = "OSM_APISERVER")]
    apiserver: Option<String>,

    /// Path to a kubeconfig file
    #[arg(long, env = "OSM_KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// YAML config file; flags override its values
    #[arg(long, env = "OSM_CONFIG")]
    config: Option<PathBuf>,

    /// Emit each family's samples contiguously under its header
    #[arg(long, env = "OSM_GROUP_BY_FAMILY")]
    group_by_family: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "OSM_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "OSM_LOG_JSON")]
    log_json: bool,
}

impl Args {
    /// Flag values as a config layer; unset flags stay unset
    fn overrides(&self) -> ConfigFile {
        ConfigFile {
            collectors: self.collectors.as_deref().map(split_list),
            namespaces: self.namespaces.as_deref().map(split_list),
            metric_whitelist: self.metric_whitelist.as_deref().map(split_list),
            metric_blacklist: self.metric_blacklist.as_deref().map(split_list),
            host: self.host.clone(),
            port: self.port,
            telemetry_host: self.telemetry_host.clone(),
            telemetry_port: self.telemetry_port,
            apiserver: self.apiserver.clone(),
            kubeconfig: self.kubeconfig.clone(),
            group_by_family: self.group_by_family.then_some(true),
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let file = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let options = Options::try_from(file.merge(args.overrides()))?;

    info!("Starting openshift-state-metrics {}", env!("CARGO_PKG_VERSION"));
    info!("  Namespaces: {}", options.namespaces);
    info!("  Layout: {:?}", options.layout);
    if !options.white_black_list.is_empty() {
        let kind = if options.white_black_list.is_white_list() {
            "whitelist"
        } else {
            "blacklist"
        };
        info!("  Metric {}: {}", kind, options.white_black_list.status());
    }

    let metrics_addr = server::listen_addr(&options.host, options.port)?;
    let telemetry_addr = server::listen_addr(&options.telemetry_host, options.telemetry_port)?;

    let client = create_client(options.apiserver.as_deref(), options.kubeconfig.as_deref())
        .await
        .map_err(|e| {
            error!("Failed to create Kubernetes client: {}", e);
            e
        })?;

    let telemetry = Arc::new(ExporterMetrics::new()?);
    let cancel = CancellationToken::new();

    // Stores are registered before the first reflector starts
    let running = Builder::new(
        KubeSourceFactory::new(client, telemetry.clone()),
        telemetry.clone(),
        cancel.clone(),
    )
    .with_namespaces(options.namespaces.clone())
    .with_enabled_collectors(options.collectors.clone())
    .with_white_black_list(options.white_black_list.clone())
    .with_layout(options.layout)
    .build()?;

    tokio::spawn(shutdown_signal(cancel.clone()));

    let telemetry_server = {
        let telemetry = telemetry.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            server::serve_telemetry(telemetry_addr, telemetry, cancel).await
        })
    };

    let served = server::serve_metrics(metrics_addr, running.registry(), cancel.clone()).await;
    if let Err(e) = &served {
        error!("Metrics server error: {}", e);
        cancel.cancel();
    }

    if let Ok(Err(e)) = telemetry_server.await {
        error!("Telemetry server error: {}", e);
    }
    running.join().await;

    info!("Exporter shutdown complete");
    served
}

/// Cancel `cancel` on SIGINT or SIGTERM
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    cancel.cancel();
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "kube=info", "tower=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
