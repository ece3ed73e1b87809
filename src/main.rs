//! Relay Proxy
//!
//! A transparent reverse proxy in front of a single upstream origin.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────┐
//!                         │                  RELAY PROXY                  │
//!                         │                                               │
//!     Client Request      │  ┌──────────┐   ┌────────────┐   ┌─────────┐  │
//!     ────────────────────┼─▶│  http    │──▶│  security  │──▶│ request │  │
//!                         │  │  server  │   │ access gate│   │ derive  │  │
//!                         │  └──────────┘   └────────────┘   └────┬────┘  │
//!                         │                                       │       │
//!                         │                                       ▼       │
//!     Client Response     │  ┌──────────┐                   ┌──────────┐  │
//!     ◀───────────────────┼──│ response │◀──────────────────│ upstream │◀─┼──── Upstream
//!                         │  │  relay   │                   │forwarder │  │     Origin
//!                         │  └──────────┘                   └──────────┘  │
//!                         │                                               │
//!                         │  config · observability · lifecycle · error   │
//!                         └───────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use relay_proxy::config::{apply_env_overrides, load_config, validate_config, ConfigError, ProxyConfig};
use relay_proxy::lifecycle::{signals, Shutdown};
use relay_proxy::observability::{logging, metrics};
use relay_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "relay-proxy")]
#[command(about = "Transparent reverse proxy for a single upstream", long_about = None)]
#[command(version)]
struct Args {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,
}

fn load(args: &Args) -> Result<ProxyConfig, ConfigError> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    let mut config = apply_env_overrides(config, |key| std::env::var(key).ok())?;
    if let Some(bind) = &args.bind {
        config.listener.bind_address = bind.clone();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load(&args)?;

    logging::init(&config.observability, config.environment);

    tracing::info!("relay-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if config.access.api_key.is_none() {
        tracing::warn!("No access.api_key configured: gated routes will reject every request");
    }

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown);
    server.run(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
