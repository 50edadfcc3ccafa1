//! Snapshot Persistence
//!
//! With snapshots enabled the whole store is written to a single JSON file
//! on a fixed interval, and read back once at startup.
//!
//! ## Lifecycle
//!
//! 1. At boot, [`load_snapshot_sync`] overlays the file (if any) on the store
//! 2. [`SnapshotTask::start`] spawns a Tokio task that saves every interval
//! 3. On shutdown, [`SnapshotTask::shutdown`] stops the task and saves once more
//!
//! The store is encoded while the lock is held, so every file is a
//! consistent point-in-time copy; the file write itself happens after the
//! lock is released. Writes go to a temporary file that is then renamed
//! over the snapshot.
//!
//! Failures are logged and otherwise ignored: a bad file means an empty
//! store, a failed save keeps the previous file.

use crate::storage::db::Db;
use crate::storage::store::Store;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Errors from reading or writing a snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// How the server persists data, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    /// Pure in-memory, no file I/O
    Disabled,
    /// Load once at boot, save every `interval`
    Snapshot { path: PathBuf, interval: Duration },
}

impl PersistenceMode {
    /// Loads the snapshot and starts periodic saving, if enabled.
    pub fn init(&self, db: &Db) -> Option<SnapshotTask> {
        match self {
            PersistenceMode::Disabled => {
                info!("Persistence mode: 'in-memory'");
                None
            }
            PersistenceMode::Snapshot { path, interval } => {
                info!(path = %path.display(), interval_ms = interval.as_millis() as u64, "Persistence mode: 'snapshot'");
                load_snapshot_sync(path, db);
                Some(SnapshotTask::start(db.clone(), path.clone(), *interval))
            }
        }
    }
}

/// Reads a snapshot file into a [`Store`].
///
/// Returns `Ok(None)` if the file does not exist or is empty.
pub fn read_snapshot(path: &Path) -> Result<Option<Store>, SnapshotError> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SnapshotError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|source| SnapshotError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Loads the snapshot at `path` into `db`, overwriting keys on conflict.
///
/// Errors are logged and leave the store as it was.
pub fn load_snapshot_sync(path: &Path, db: &Db) {
    match read_snapshot(path) {
        Ok(Some(loaded)) => {
            let keys = loaded.len();
            db.lock().merge(loaded);
            info!(path = %path.display(), keys, "Datastore loaded successfully");
        }
        Ok(None) => debug!(path = %path.display(), "No snapshot to load"),
        Err(e) => error!(error = %e, "Failed to load datastore"),
    }
}

/// Encodes the store as snapshot JSON.
pub fn encode_snapshot(db: &Db) -> Result<Vec<u8>, serde_json::Error> {
    let store = db.lock();
    serde_json::to_vec(&*store)
}

/// Writes a snapshot of `db` to `path`, replacing the previous file.
pub async fn write_snapshot(path: &Path, db: &Db) -> Result<usize, SnapshotError> {
    let data = encode_snapshot(db).map_err(|source| SnapshotError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = tmp_path(path);
    let io_err = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };

    tokio::fs::write(&tmp, &data).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;

    Ok(data.len())
}

/// Saves a snapshot, logging the outcome instead of returning it.
pub async fn save_snapshot(path: &Path, db: &Db) {
    match write_snapshot(path, db).await {
        Ok(bytes) => debug!(path = %path.display(), bytes, "Saved datastore to file"),
        Err(e) => error!(error = %e, "Failed to save datastore"),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// A handle to the running snapshot task.
///
/// Dropping the handle also stops the task; it still writes one final
/// snapshot on its way out, but nothing waits for it.
#[derive(Debug)]
pub struct SnapshotTask {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SnapshotTask {
    /// Spawns the periodic saver. The first save happens one `period` from now.
    pub fn start(db: Db, path: PathBuf, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(snapshot_loop(db, path, period, shutdown_rx));

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stops the task, then waits for its final save to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            error!(error = %e, "Snapshot task failed");
        }
        info!("Snapshot task stopped");
    }
}

async fn snapshot_loop(
    db: Db,
    path: PathBuf,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => save_snapshot(&path, &db).await,
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Snapshot task received shutdown signal");
                    save_snapshot(&path, &db).await;
                    return;
                }
            }
        }
    }
}
