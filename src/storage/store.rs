//! Key Store with Lazy Expiry
//!
//! The [`Store`] holds two tables:
//!
//! - `entries`: key → [`Entry`] (a string or a list)
//! - `expiry`: key → absolute expiry time in milliseconds since the Unix epoch
//!
//! ## Lazy Expiry
//!
//! Nothing sweeps expired keys in the background. Every command goes through
//! [`Store::resolve`], which deletes a key whose deadline has passed from
//! both tables before reporting it absent. An expired key nobody touches
//! keeps its memory until the next access.
//!
//! ## Serialized Form
//!
//! The store serializes to the snapshot layout directly:
//!
//! ```json
//! {
//!   "store": { "name": { "type": "string", "val": "Ariz" },
//!              "page": { "type": "list", "val": ["2", "<p>", "hi"] } },
//!   "expiryTime": { "name": 1767225600000 }
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

/// A stored value. Its kind never changes in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "val", rename_all = "lowercase")]
pub enum Entry {
    /// A single text value
    String(String),
    /// Text tokens, pushed and popped at both ends
    List(VecDeque<String>),
}

/// The kind of an [`Entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    String,
    List,
}

impl Entry {
    pub fn kind(&self) -> Kind {
        match self {
            Entry::String(_) => Kind::String,
            Entry::List(_) => Kind::List,
        }
    }

    /// Creates an empty list entry.
    pub fn empty_list() -> Self {
        Entry::List(VecDeque::new())
    }
}

/// Remaining lifetime of a key, as reported by [`Store::ttl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The key does not exist (or just expired)
    Missing,
    /// The key exists and has no expiry
    Persistent,
    /// Milliseconds until the key expires
    Remaining(i64),
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// The key/value table plus the expiry table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    #[serde(rename = "store", default)]
    entries: HashMap<String, Entry>,

    #[serde(rename = "expiryTime", default, deserialize_with = "finite_deadlines")]
    expiry: HashMap<String, i64>,
}

/// Reads the expiry table, keeping only rows whose deadline is a finite
/// number. Fractional deadlines are rounded down to whole milliseconds.
fn finite_deadlines<'de, D>(deserializer: D) -> Result<HashMap<String, i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows = HashMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(rows
        .into_iter()
        .filter_map(|(key, at)| {
            let at = match at.as_i64() {
                Some(ms) => ms,
                None => at.as_f64().filter(|ms| ms.is_finite())?.floor() as i64,
            };
            Some((key, at))
        })
        .collect())
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a key, applying lazy expiry first.
    ///
    /// If the key's deadline is due it is removed from both tables and
    /// `None` is returned, whatever the caller meant to do with it.
    pub fn resolve(&mut self, key: &str) -> Option<&mut Entry> {
        if self.is_due(key, now_ms()) {
            self.entries.remove(key);
            self.expiry.remove(key);
            return None;
        }
        self.entries.get_mut(key)
    }

    /// Resolves a key, creating it with `default` if it is absent.
    pub fn get_or_insert_with<F>(&mut self, key: &str, default: F) -> &mut Entry
    where
        F: FnOnce() -> Entry,
    {
        self.resolve(key);
        self.entries.entry(key.to_string()).or_insert_with(default)
    }

    /// Stores an entry, replacing any previous one.
    ///
    /// The key's TTL is left as it is.
    pub fn set(&mut self, key: impl Into<String>, entry: Entry) {
        let key = key.into();
        self.resolve(&key);
        self.entries.insert(key, entry);
    }

    /// Removes a key and its TTL. Returns whether a live key was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        if self.resolve(key).is_none() {
            return false;
        }
        self.expiry.remove(key);
        self.entries.remove(key).is_some()
    }

    /// Sets the key to expire `seconds` from now.
    ///
    /// Zero or negative values schedule an expiry that is already due.
    /// Returns `false` if the key does not exist.
    pub fn set_ttl(&mut self, key: &str, seconds: i64) -> bool {
        let at = now_ms().saturating_add(seconds.saturating_mul(1000));
        self.expire_at(key, at)
    }

    /// Sets the absolute expiry time of an existing key.
    pub fn expire_at(&mut self, key: &str, at_ms: i64) -> bool {
        if self.resolve(key).is_none() {
            return false;
        }
        self.expiry.insert(key.to_string(), at_ms);
        true
    }

    /// Reports the remaining lifetime of a key.
    pub fn ttl(&mut self, key: &str) -> Ttl {
        if self.resolve(key).is_none() {
            return Ttl::Missing;
        }
        match self.expiry.get(key) {
            Some(&at) => Ttl::Remaining((at - now_ms()).max(0)),
            None => Ttl::Persistent,
        }
    }

    /// Overlays `other` on top of this store.
    ///
    /// Entries and deadlines from `other` win on conflict. Deadlines left
    /// without an entry are dropped.
    pub fn merge(&mut self, other: Store) {
        for (key, entry) in other.entries {
            self.expiry.remove(&key);
            self.entries.insert(key, entry);
        }
        self.expiry.extend(other.expiry);

        let entries = &self.entries;
        self.expiry.retain(|key, _| entries.contains_key(key));
    }

    /// Number of keys held, including expired keys not accessed since.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys that carry a deadline.
    pub fn expiring(&self) -> usize {
        self.expiry.len()
    }

    fn is_due(&self, key: &str, now: i64) -> bool {
        self.expiry.get(key).is_some_and(|&at| at <= now)
    }
}
