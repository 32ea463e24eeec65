//! Passthrough gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                   GATEWAY                    │
//!   GET /sequenced/h1/x   │  ┌────────┐   ┌────────────┐   ┌──────────┐  │
//!   ──────────────────────┼─▶│  http  │──▶│ dispatcher │──▶│ registry │  │
//!                         │  │handlers│   └─────┬──────┘   └────┬─────┘  │
//!                         │  └───┬────┘         │ envelope      │ spawn  │
//!                         │      │              ▼               ▼        │
//!                         │      │        ┌──────────────────────────┐   │
//!                         │      │        │  worker (one per dest)   │───┼──▶ h1
//!                         │      │        └──────────────────────────┘   │
//!                         │      │ simple / delayed                      │
//!                         │      └───────────────────────────────────────┼──▶ h2
//!                         │                                              │
//!                         │  config (hot reload) · observability · admin │
//!                         └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use passthrough_gateway::config::{loader, watcher::ConfigWatcher, GatewayConfig};
use passthrough_gateway::lifecycle::{signals, Shutdown};
use passthrough_gateway::observability::{logging, metrics};
use passthrough_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "passthrough-gateway")]
#[command(about = "Per-destination request serialization gateway", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => loader::load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "passthrough-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        queue_capacity = config.sequencer.queue_capacity,
        dispatch_timeout_secs = config.sequencer.dispatch_timeout_secs,
        worker_lifetime_secs = config.sequencer.worker_lifetime_secs,
        lifetime_mode = ?config.sequencer.lifetime_mode,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    // The watcher must stay alive for events to keep flowing.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    tokio::spawn(async move {
        signals::forward_to(&shutdown).await;
    });

    let server = HttpServer::new(config);
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
