//! Shared Store Handle
//!
//! Connection tasks run on Tokio's multi-threaded runtime, so the [`Store`]
//! lives behind one mutex. Each command holds the lock for its whole
//! execution and never awaits while holding it, which makes every command
//! atomic with respect to every other command and to snapshot encoding.

use crate::storage::store::Store;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A cloneable handle to the single shared [`Store`].
///
/// # Example
///
/// ```
/// use tidekv::storage::{Db, Entry};
///
/// let db = Db::new();
/// db.lock().set("name", Entry::String("Ariz".into()));
///
/// let other = db.clone();
/// assert_eq!(other.lock().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Db {
    store: Arc<Mutex<Store>>,
}

impl Db {
    /// Creates a handle to an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the store.
    ///
    /// A panic inside a command leaves the maps structurally valid, so a
    /// poisoned lock is taken over rather than propagated.
    pub fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with exclusive access to the store.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Store) -> R,
    {
        f(&mut self.lock())
    }
}
