//! SegmentKV Server Binary
//!
//! Recovers the working directory and starts the TCP server.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use segmentkv::network::Server;
use segmentkv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// SegmentKV Server
#[derive(Parser, Debug)]
#[command(name = "segmentkv-server")]
#[command(about = "Append-only segmented key-value store")]
#[command(version)]
struct Args {
    /// Properties file with kvs.workingPath, kvs.host and kvs.port
    #[arg(short, long, default_value = "application.properties")]
    config: PathBuf,

    /// Working directory (overrides kvs.workingPath)
    #[arg(short, long)]
    working_path: Option<PathBuf>,

    /// Listen address host:port (overrides kvs.host / kvs.port)
    #[arg(short, long)]
    listen: Option<String>,

    /// Segment capacity in bytes
    #[arg(short, long)]
    segment_size: Option<u64>,

    /// Per-table LRU cache capacity in entries
    #[arg(long)]
    cache_capacity: Option<usize>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,segmentkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("SegmentKV Server v{}", segmentkv::VERSION);
    tracing::info!("Working path: {}", config.working_path.display());
    tracing::info!("Listen address: {}", config.listen_addr);

    let engine = match Engine::open(&config) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Recovery failed: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    engine.shutdown();
    tracing::info!("Server stopped");
}

/// Properties file first, then command line overrides
fn load_config(args: &Args) -> segmentkv::Result<Config> {
    let mut config = Config::from_properties(&args.config)?;

    if let Some(path) = &args.working_path {
        config.working_path = path.clone();
    }
    if let Some(addr) = &args.listen {
        config.listen_addr = addr.clone();
    }
    if let Some(size) = args.segment_size {
        config.segment_size_limit = size;
    }
    if let Some(capacity) = args.cache_capacity {
        config.cache_capacity = capacity;
    }

    Ok(config)
}
