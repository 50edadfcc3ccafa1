//! Connection Module
//!
//! Every accepted client is served by its own async task. Tasks share the
//! store through [`CommandHandler`](crate::commands::CommandHandler) and
//! nothing else, so a failing connection never affects the others.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 TCP Listener                    │
//! │                  (main.rs)                      │
//! └───────────────────────┬─────────────────────────┘
//!                         │ accept(), spawn task
//!                         ▼
//! ┌─────────────────────────────────────────────────┐
//! │               ConnectionHandler                 │
//! │                                                 │
//! │  ┌───────────┐   ┌────────────┐   ┌──────────┐  │
//! │  │ Read bytes│──>│ Parse RESP │──>│ Execute  │  │
//! │  └───────────┘   └────────────┘   └────┬─────┘  │
//! │                                        ▼        │
//! │                                  ┌──────────┐   │
//! │                                  │ Reply    │   │
//! │                                  └──────────┘   │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tidekv::commands::CommandHandler;
//! use tidekv::connection::{handle_connection, ConnectionConfig, ConnectionStats};
//! use tidekv::storage::Db;
//! use tokio::net::TcpListener;
//!
//! # async fn serve() -> std::io::Result<()> {
//! let listener = TcpListener::bind("127.0.0.1:6379").await?;
//! let db = Db::new();
//! let stats = Arc::new(ConnectionStats::new());
//!
//! loop {
//!     let (stream, addr) = listener.accept().await?;
//!     let handler = CommandHandler::new(db.clone());
//!     tokio::spawn(handle_connection(
//!         stream,
//!         addr,
//!         handler,
//!         ConnectionConfig::default(),
//!         Arc::clone(&stats),
//!     ));
//! }
//! # }
//! ```

pub mod handler;

pub use handler::{
    handle_connection, ConnectionConfig, ConnectionError, ConnectionHandler, ConnectionStats,
    DEFAULT_MAX_REQUEST_SIZE, DEFAULT_PARTIAL_REQUEST_TIMEOUT,
};
