//! TideKV - A Small In-Memory Key-Value Store
//!
//! This is the main entry point for the TideKV server.
//! It loads the configuration, restores the snapshot, and serves clients
//! until Ctrl+C.

use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tidekv::commands::CommandHandler;
use tidekv::config::Config;
use tidekv::connection::{handle_connection, ConnectionConfig, ConnectionStats};
use tidekv::storage::Db;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "tidekv",
    version,
    about = "TideKV - a small in-memory key-value store spoken over RESP",
    after_help = "Use redis-cli or any Redis client to connect:\n    $ redis-cli -p 6379 PING"
)]
struct Args {
    /// JSON config file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Host to bind to [default: 127.0.0.1]
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on [default: 6379]
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable periodic snapshots
    #[arg(long)]
    snapshot: bool,

    /// Milliseconds between snapshots [default: 10000]
    #[arg(long, value_name = "MS")]
    snapshot_interval: Option<u64>,

    /// Snapshot file [default: data.rdb]
    #[arg(long, value_name = "FILE")]
    snapshot_path: Option<PathBuf>,

    /// Milliseconds a half-sent request may stall before it is rejected [default: 250]
    #[arg(long, value_name = "MS")]
    partial_request_timeout: Option<u64>,
}

impl Args {
    /// Builds the effective config: file first, then flags on top.
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.snapshot {
            config.snapshot = true;
        }
        if let Some(interval) = self.snapshot_interval {
            config.snapshot_interval = interval;
        }
        if let Some(path) = self.snapshot_path {
            config.snapshot_path = path;
        }
        if let Some(timeout) = self.partial_request_timeout {
            config.partial_request_timeout = timeout;
        }

        Ok(config)
    }
}

fn print_banner(config: &Config) {
    println!(
        r#"
  ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
   _____ _     _      _  ____     __
  |_   _(_) __| | ___| |/ /\ \   / /
    | | | |/ _` |/ _ \ ' /  \ \ / /
    | | | | (_| |  __/ . \   \ V /
    |_| |_|\__,_|\___|_|\_\   \_/
  ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

TideKV v{} - In-Memory Key-Value Store
──────────────────────────────────────────────────────────────
Server starting on {}
Snapshots: {}

Use Ctrl+C to shutdown gracefully.
"#,
        tidekv::VERSION,
        config.bind_address(),
        if config.snapshot {
            config.snapshot_path.display().to_string()
        } else {
            "off".to_string()
        }
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tidekv=info".into()),
        )
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let config = Args::parse().into_config()?;

    print_banner(&config);

    // The store shared by every connection
    let db = Db::new();
    let snapshots = config.persistence_mode().init(&db);

    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!(address = %config.bind_address(), "Ready to accept connections");

    tokio::select! {
        _ = accept_loop(listener, db, config.connection_config(), Arc::clone(&stats)) => {}
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for Ctrl+C");
            }
            info!("Shutdown signal received, stopping server...");
        }
    }

    if let Some(task) = snapshots {
        task.shutdown().await;
    }

    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        rejected = stats.requests_rejected.load(Ordering::Relaxed),
        bytes_read = stats.bytes_read.load(Ordering::Relaxed),
        bytes_written = stats.bytes_written.load(Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    db: Db,
    config: ConnectionConfig,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = CommandHandler::new(db.clone());
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, config, stats).await;
                });
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }
}
