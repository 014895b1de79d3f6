//! Cookie relay server.
//!
//! ```text
//!   Client ──▶ request id ──▶ cookie relay ──────────▶ upstream / 204
//!                                 │    ▲
//!                   selected      │    │  Set-Cookie
//!                   cookies,      ▼    │  (configured names only)
//!                   headers, params  target address
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use cookie_relay::config::{load_config, validate_config, ConfigError, ServerConfig};
use cookie_relay::http::HttpServer;
use cookie_relay::lifecycle::{shutdown_on_signal, Shutdown};
use cookie_relay::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "cookie-relay")]
#[command(about = "Relays Set-Cookie headers from a session service onto proxied responses", long_about = None)]
struct Cli {
    /// Path to a TOML or JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!("cookie-relay v{} starting", env!("CARGO_PKG_VERSION"));

    // Re-check after CLI overrides; without a file this reports the missing target.
    if let Err(errors) = validate_config(&config) {
        return Err(ConfigError::Validation(errors).into());
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        target = %config.relay.target_address,
        cookies = ?config.relay.cookies,
        headers = ?config.relay.headers,
        parameters = ?config.relay.parameters,
        policy = ?config.relay.policy,
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
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
