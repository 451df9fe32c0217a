//! Fallback proxy (v1)
//!
//! A reverse proxy that serves a cached fallback page when its upstream
//! answers with a configured status code or does not answer in time.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ trace / request id / timeout ──▶ FallbackLayer ──▶ proxy_handler ──▶ Upstream
//!                                                     │
//!                                 trigger status,     │
//!                                 failure, timeout    ▼
//!                                               HttpFetcher ──▶ TTL cache ──▶ Fallback source
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use fallback_proxy::config::{self, validate_config, ConfigError, ProxyConfig};
use fallback_proxy::observability::{logging, metrics};
use fallback_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "fallback-proxy")]
#[command(about = "Reverse proxy serving a cached fallback page for failing upstreams")]
#[command(long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,
}

fn load(cli: &Cli) -> Result<ProxyConfig, ConfigError> {
    match &cli.config {
        Some(path) => config::load_config(path),
        None => {
            let config = ProxyConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.observability.log_level.clone());
    logging::init_logging(&level);

    tracing::info!("fallback-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        config_path = ?cli.config,
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
    tokio::spawn(shutdown.clone().trigger_on_signal());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
