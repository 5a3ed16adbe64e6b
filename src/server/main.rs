//! HTTP server for the provider / service area API.
//!
//! Serves provider and service area CRUD plus the point-in-area lookup
//! from a sled store on local disk.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use service_areas::api::{self, AppState};
use service_areas::Store;

use crate::config::Config;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Provider and service area API server")]
struct Args {
    /// Listen address [default: 0.0.0.0:8000]
    #[arg(short, long)]
    listen: Option<String>,

    /// Directory holding the sled database [default: ./data]
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Default log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("Invalid log filter")?;
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            Config::load_from_file(path)?
        }
        None => Config::default(),
    };
    let settings = config.resolve(args.listen, args.data_dir);

    info!("Service Areas Server");

    let store = Store::open(&settings.data_dir)
        .with_context(|| format!("Failed to open store at {}", settings.data_dir.display()))?;
    info!(
        "Spatial index ready with {} service areas",
        store.indexed_areas().await
    );

    let state = Arc::new(AppState::new(store));
    let app = api::router(Arc::clone(&state));

    info!("Starting server on {}", settings.listen);

    let listener = tokio::net::TcpListener::bind(&settings.listen)
        .await
        .with_context(|| format!("Failed to bind {}", settings.listen))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, flushing store");
    state.store.flush().await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
