//! Chunkserver
//!
//! Chunk storage node for a distributed object store.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Chunkserver                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │     HTTP     │───▶│  ChunkStore  │───▶│   Backend    │       │
//! │  │  /api/chunk  │    │  (validate)  │    │ (disk / mem) │       │
//! │  └──────────────┘    └──────────────┘    └──────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chunkserver::config::{
    DEFAULT_LISTEN_ADDR, DEFAULT_MAX_BODY_BYTES, DEFAULT_NODE_ID, DEFAULT_STORAGE_PATH,
};
use chunkserver::server::{self, AppState};
use chunkserver::{BackendKind, ChunkStore, Result, ServerConfig, StoreConfig};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Chunkserver - chunk storage node
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Storage root for the disk backend
    #[arg(long, env = "CHUNKSERVER_STORAGE_PATH", default_value = DEFAULT_STORAGE_PATH)]
    storage_path: PathBuf,

    /// Storage backend
    #[arg(long, env = "CHUNKSERVER_BACKEND", value_enum, default_value = "disk")]
    backend: BackendKind,

    /// Node identifier reported in stats and health
    #[arg(long, env = "CHUNKSERVER_ID", default_value = DEFAULT_NODE_ID)]
    node_id: String,

    /// HTTP listen address
    #[arg(long, env = "CHUNKSERVER_LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    listen_addr: SocketAddr,

    /// Maximum request body in bytes
    #[arg(long, env = "CHUNKSERVER_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,

    /// fsync every chunk before acknowledging the write
    #[arg(long, env = "CHUNKSERVER_SYNC_WRITES")]
    sync_writes: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    info!("Starting Chunkserver v{}", chunkserver::VERSION);
    info!("  Node ID: {}", args.node_id);
    info!("  Backend: {}", args.backend);
    info!("  Listen address: {}", args.listen_addr);
    info!("  Sync writes: {}", args.sync_writes);

    let store_config = StoreConfig {
        backend: args.backend,
        storage_path: args.storage_path.clone(),
        node_id: args.node_id.clone(),
        sync_writes: args.sync_writes,
    };

    let store = ChunkStore::open(&store_config).map_err(|e| {
        error!("Failed to initialize chunk store: {}", e);
        e
    })?;

    let server_config = ServerConfig {
        listen_addr: args.listen_addr,
        max_body_bytes: args.max_body_bytes,
    };

    let listener = server::bind(&server_config).await?;
    let state = Arc::new(AppState::new(store, server_config));

    server::run_server(state, listener, shutdown_signal()).await?;

    info!("Chunkserver shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
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
    for directive in ["hyper=warn", "hyper_util=warn"] {
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
