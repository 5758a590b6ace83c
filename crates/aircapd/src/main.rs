//! aircapd - wireless capture daemon
//!
//! Wires the pieces together: configuration, the packet chain, the data
//! source tracker with its drivers and retry timer, and the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Run with the default config path
//! aircapd
//!
//! # Explicit config and verbose logging
//! aircapd --config /etc/aircap/aircap.toml --log-level debug
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use aircap_api::{build_router, AppState};
use aircap_config::{Config, LogFormat};
use aircap_datasource::{DataSourceTracker, TrackerConfig};
use aircap_pipeline::{PacketChain, PacketReceiver};

/// Wireless capture daemon
#[derive(Parser, Debug)]
#[command(name = "aircapd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "configs/aircap.toml")]
    config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or_else(|| config.log.level.as_str());
    init_logging(level, config.log.format)?;

    tracing::info!(
        config = %cli.config.display(),
        drivers = config.capture.drivers.len(),
        boot_sources = config.capture.sources.len(),
        "aircapd starting"
    );

    run(config).await
}

/// Load the config file, falling back to defaults when it does not exist
fn load_config(path: &PathBuf) -> Result<Config> {
    if path.exists() {
        Config::from_file(path).with_context(|| format!("loading {}", path.display()))
    } else {
        eprintln!(
            "config file {} not found, using built-in defaults",
            path.display()
        );
        Ok(Config::default())
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Console => registry.with(fmt::layer().with_target(true)).init(),
    }

    Ok(())
}

/// Bring the capture subsystem up and serve until interrupted
async fn run(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();

    // Packet chain: sources submit, the drain task consumes
    let (chain, receiver) = PacketChain::new(config.capture.chain_depth);
    let chain_metrics = chain.metrics_handle();
    tokio::spawn(drain_packets(receiver, cancel.clone()));

    // Tracker with the configured drivers
    let tracker = DataSourceTracker::new(
        chain,
        TrackerConfig {
            bin_paths: config.capture.bin_paths.clone(),
            retry_interval: config.capture.retry_interval,
            probe_timeout: Some(config.capture.probe_timeout),
        },
    );

    for driver in &config.capture.drivers {
        tracker
            .register_driver(&driver.type_tag, &driver.description, &driver.binary)
            .with_context(|| format!("registering driver '{}'", driver.type_tag))?;
    }

    // Sources defined in the config open at boot; failures land in the
    // failed list and retry rather than aborting startup
    for definition in &config.capture.sources {
        if let Err(e) = tracker.open_source(definition) {
            tracing::error!(definition = %definition, error = %e, "boot source rejected");
        }
    }

    let retry_timer = tracker.spawn_retry_timer(cancel.clone());

    // Shutdown on ctrl-c
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            shutdown.cancel();
        }
    });

    if config.api.enabled {
        serve_api(&config, &tracker, chain_metrics, cancel.clone()).await?;
    } else {
        cancel.cancelled().await;
    }

    tracker.shutdown();
    retry_timer.abort();
    tracing::info!("aircapd stopped");
    Ok(())
}

/// Serve the HTTP API until cancelled
async fn serve_api(
    config: &Config,
    tracker: &Arc<DataSourceTracker>,
    chain_metrics: aircap_pipeline::ChainMetricsHandle,
    cancel: CancellationToken,
) -> Result<()> {
    let state = AppState::new(Arc::clone(tracker)).with_chain_metrics(chain_metrics);
    let app = build_router(state);

    let bind_addr = config.api.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding API to {bind_addr}"))?;

    tracing::info!(address = %bind_addr, "API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("API server error")
}

/// Consume the packet chain
///
/// Downstream processing (link-layer decoders, log writers) attaches here;
/// the daemon itself only accounts for the packets it swallows.
async fn drain_packets(mut receiver: PacketReceiver, cancel: CancellationToken) {
    let mut drained: u64 = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            packet = receiver.recv() => match packet {
                Some(packet) => {
                    drained += 1;
                    tracing::trace!(
                        bytes = packet.len(),
                        dlt = packet.dlt,
                        total = drained,
                        "packet drained"
                    );
                }
                None => break,
            }
        }
    }
    tracing::debug!(total = drained, "packet drain stopped");
}
