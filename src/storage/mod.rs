//! Storage Module
//!
//! This module holds the data itself and everything that keeps it:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  Db (Arc<Mutex>)            │
//! │  ┌───────────────────────────────────────┐  │
//! │  │                Store                  │  │
//! │  │   entries: key → String | List        │  │
//! │  │   expiry:  key → deadline (ms)        │  │
//! │  └───────────────────────────────────────┘  │
//! └─────────────────────────────────────────────┘
//!                       ▲
//!                       │ encode under lock, write after
//!         ┌─────────────┴─────────────┐
//!         │       SnapshotTask        │
//!         │  (Background Tokio Task)  │
//!         └───────────────────────────┘
//! ```
//!
//! - `store`: entries, deadlines and lazy expiry
//! - `db`: the shared, lock-protected handle used by connections
//! - `snapshot`: JSON snapshot load/save and the periodic saver
//!
//! ## Example
//!
//! ```
//! use tidekv::storage::{Db, Entry, Ttl};
//!
//! let db = Db::new();
//! let mut store = db.lock();
//!
//! store.set("session", Entry::String("token123".into()));
//! assert!(store.set_ttl("session", 3600));
//! assert!(matches!(store.ttl("session"), Ttl::Remaining(_)));
//! ```

pub mod db;
pub mod snapshot;
pub mod store;

pub use db::Db;
pub use snapshot::{
    load_snapshot_sync, read_snapshot, save_snapshot, write_snapshot, PersistenceMode,
    SnapshotError, SnapshotTask,
};
pub use store::{now_ms, Entry, Kind, Store, Ttl};
