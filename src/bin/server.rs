//! kvlog Server Binary
//!
//! Replays the transaction log, serves until SIGINT/SIGTERM, then drains
//! and closes the log.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use kvlog::network::Server;
use kvlog::{Config, Engine, SyncPolicy};
use tracing_subscriber::{fmt, EnvFilter};

/// kvlog Server
#[derive(Parser, Debug)]
#[command(name = "kvlog-server")]
#[command(about = "In-memory key-value store with a durable transaction log")]
#[command(version)]
struct Args {
    /// Transaction log file
    #[arg(short = 'f', long, default_value = "./transaction.log")]
    log_file: PathBuf,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Events that may be queued for the writer before callers block
    #[arg(short, long, default_value = "10")]
    queue_capacity: usize,

    /// fsync the log after every record
    #[arg(long)]
    fsync: bool,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kvlog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("kvlog Server v{}", kvlog::VERSION);
    tracing::info!("Transaction log: {}", args.log_file.display());
    tracing::info!("Listen address: {}", args.listen);

    let sync_policy = if args.fsync {
        SyncPolicy::EveryWrite
    } else {
        SyncPolicy::OsBuffered
    };

    let config = Config::builder()
        .log_path(&args.log_file)
        .listen_addr(&args.listen)
        .queue_capacity(args.queue_capacity)
        .sync_policy(sync_policy)
        .max_connections(args.max_connections)
        .build();

    // Recovery failure is fatal: never serve a partially replayed store
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Engine initialized: {} keys, last sequence {}",
        engine.store().len(),
        engine.last_sequence()
    );

    let server = Server::new(config, Arc::clone(&engine));

    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Shutdown signal received");
        shutdown.shutdown();
    }) {
        tracing::error!("Failed to install shutdown handler: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    let open_connections = server.active_connections();
    drop(server);
    match Arc::try_unwrap(engine) {
        Ok(engine) => {
            if let Err(e) = engine.close() {
                tracing::error!("Failed to close engine: {}", e);
                std::process::exit(1);
            }
        }
        Err(engine) => {
            tracing::warn!(
                "{} connections still open; draining transaction log",
                open_connections
            );
            engine.drain();
        }
    }

    tracing::info!("Server stopped");
}
