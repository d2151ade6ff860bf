//! wfs-server - record intake, scoring and reporting service
//!
//! Configuration resolves once at startup (CLI, environment, TOML file,
//! defaults), then the database is opened, the optional background worker is
//! started and the HTTP server runs until Ctrl-C.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wfs_common::config::{resolve_config, CliOverrides};
use wfs_server::worker::{self, QUEUE_CAPACITY};
use wfs_server::{build_router, AppState};

/// Command-line arguments for wfs-server
#[derive(Parser, Debug)]
#[command(name = "wfs-server")]
#[command(about = "Record intake, scoring and reporting service")]
#[command(version)]
struct Args {
    /// TOML config file (default: <config dir>/wfs/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:5780
    #[arg(short, long)]
    bind: Option<String>,

    /// Shared secret required on write requests
    #[arg(long)]
    api_key: Option<String>,

    /// Deployment environment reported by /version
    #[arg(long)]
    environment: Option<String>,

    /// Process new records in the background
    #[arg(long)]
    auto_process: Option<bool>,

    /// Log level when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        CliOverrides {
            config_file: args.config,
            database: args.database,
            bind_addr: args.bind,
            api_key: args.api_key,
            environment: args.environment,
            auto_process: args.auto_process,
            log_level: args.log_level,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args.into()).context("Failed to resolve configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("wfs_server={0},wfs_common={0},tower_http={0}", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting wfs-server v{} [{}] built {} ({}), environment {}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
        config.environment
    );
    info!("Database: {}", config.database_path.display());

    let pool = match wfs_common::db::init_database(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    if config.api_key.is_some() {
        info!("API key required for write requests");
    } else {
        warn!("No API key configured, write requests are open");
    }

    let queue = if config.auto_process {
        let (queue, _handle) = worker::spawn_worker(pool.clone(), QUEUE_CAPACITY);
        info!("Background processing enabled");
        Some(queue)
    } else {
        None
    };

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(pool.clone(), config, queue);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
