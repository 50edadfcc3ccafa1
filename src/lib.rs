//! # TideKV - A Small In-Memory Key-Value Store
//!
//! TideKV speaks RESP, so `redis-cli` and ordinary Redis clients can talk
//! to it. It holds string and list values, expires keys lazily, and can
//! persist everything to a JSON snapshot on a fixed interval.
//!
//! ## Features
//!
//! - **RESP wire protocol**: requests are arrays of bulk strings
//! - **Strings and lists**: `SET`/`GET`/`INCR`/`DECR` and `LPUSH`/`RPUSH`/`LPOP`/`RPOP`/`LRANGE`/`LLEN`
//! - **TTL support**: `EXPIRE`/`TTL`, enforced when a key is touched
//! - **Snapshots**: the whole store in one JSON file, reloaded at startup
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                            TideKV                            │
//! │                                                              │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐       │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │       │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │       │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘       │
//! │                            │                  │ one lock     │
//! │                            ▼                  ▼ per command  │
//! │                     ┌─────────────┐    ┌─────────────┐       │
//! │                     │ RESP Parser │    │ Db (Mutex)  │       │
//! │                     └─────────────┘    │   Store     │       │
//! │                                        └──────▲──────┘       │
//! │                                               │              │
//! │                                        ┌──────┴──────┐       │
//! │                                        │SnapshotTask │       │
//! │                                        └─────────────┘       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tidekv::commands::CommandHandler;
//! use tidekv::connection::{handle_connection, ConnectionConfig, ConnectionStats};
//! use tidekv::storage::{Db, PersistenceMode};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Db::new();
//!     let _snapshots = PersistenceMode::Disabled.init(&db);
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:6379").await?;
//!     loop {
//!         let (stream, addr) = listener.accept().await?;
//!         let handler = CommandHandler::new(db.clone());
//!         tokio::spawn(handle_connection(
//!             stream,
//!             addr,
//!             handler,
//!             ConnectionConfig::default(),
//!             Arc::clone(&stats),
//!         ));
//!     }
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`, `COMMAND`
//! - `SET key value`, `GET key`, `DEL key [key ...]`
//! - `INCR key`, `DECR key`
//! - `EXPIRE key seconds`, `TTL key`
//! - `LPUSH key value [value ...]`, `RPUSH key value [value ...]`
//! - `LPOP key`, `RPOP key`, `LRANGE key start stop`, `LLEN key`
//!
//! ## Module Overview
//!
//! - [`protocol`]: request parser and reply types
//! - [`storage`]: the store, lazy expiry and snapshots
//! - [`commands`]: command semantics
//! - [`connection`]: per-client read/execute/reply loop
//! - [`config`]: config file and defaults
//!
//! ## Design Highlights
//!
//! ### One Lock
//!
//! All data sits behind a single mutex. A command holds it from lookup to
//! reply, so no two commands ever interleave, and a snapshot is always
//! a consistent point-in-time copy.
//!
//! ### Lazy Expiry
//!
//! There is no background sweeper. A key whose deadline has passed is
//! deleted the next time any command touches it.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use config::Config;
pub use connection::{handle_connection, ConnectionConfig, ConnectionStats};
pub use protocol::{ParseError, Request, RespParser, RespValue};
pub use storage::{Db, PersistenceMode, SnapshotTask};

/// The default port TideKV listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host TideKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of TideKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
