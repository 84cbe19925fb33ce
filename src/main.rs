use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use gatekeeper::config::loader;
use gatekeeper::lifecycle::{signals, startup};
use gatekeeper::observability::{logging, metrics};
use gatekeeper::storage::{MemoryUserStore, UserStore};
use gatekeeper::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "gatekeeper", version, about = "Authentication and admission-control service")]
struct Args {
    /// Path to a TOML config file. GATEKEEPER_* variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Values from .env never override the real environment
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = loader::load(args.config.as_deref())?;
    logging::init_logging(&config.observability.log_level, config.is_production())?;

    tracing::info!("gatekeeper v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        bind_address = %config.listener.bind_address,
        rate_limit_enabled = config.rate_limit.enabled,
        requests_per_second = config.rate_limit.requests_per_second,
        burst_size = config.rate_limit.burst_size,
        "Configuration loaded"
    );

    // Initialize metrics server
    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let store: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
    if let Err(e) = startup::verify_dependency(store.as_ref(), &config.startup).await {
        tracing::error!(error = %e, "Storage unreachable, refusing to start");
        return Err(e.into());
    }

    // Bind TCP listener
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config, store)?;
    let outcome = server.run(listener, shutdown).await?;

    tracing::info!(?outcome, "Shutdown complete");
    Ok(())
}
