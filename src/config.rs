//! Server Configuration
//!
//! Settings come from an optional JSON file and are then overridden by
//! command-line flags (see `main.rs`). Every key is optional:
//!
//! ```json
//! {
//!   "host": "127.0.0.1",
//!   "port": 6379,
//!   "snapshot": true,
//!   "snapshotInterval": 10000,
//!   "snapshotPath": "data.rdb",
//!   "partialRequestTimeout": 250,
//!   "maxRequestSize": 8388608
//! }
//! ```
//!
//! Durations are in milliseconds. Unknown keys are rejected.

use crate::connection::{ConnectionConfig, DEFAULT_MAX_REQUEST_SIZE};
use crate::storage::PersistenceMode;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default snapshot interval in milliseconds
pub const DEFAULT_SNAPSHOT_INTERVAL_MS: u64 = 10_000;

/// Default snapshot file
pub const DEFAULT_SNAPSHOT_PATH: &str = "data.rdb";

/// Default partial request timeout in milliseconds
pub const DEFAULT_PARTIAL_REQUEST_TIMEOUT_MS: u64 = 250;

/// Errors from loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Whether snapshot persistence is on
    pub snapshot: bool,
    /// Milliseconds between snapshots
    pub snapshot_interval: u64,
    /// Where the snapshot lives
    pub snapshot_path: PathBuf,
    /// Milliseconds a half-sent request may stall before it is rejected
    pub partial_request_timeout: u64,
    /// Largest request a connection will buffer, in bytes
    pub max_request_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            snapshot: false,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL_MS,
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            partial_request_timeout: DEFAULT_PARTIAL_REQUEST_TIMEOUT_MS,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
        }
    }
}

impl Config {
    /// Reads a config file. Keys it leaves out keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&data).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses config JSON.
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval.max(1))
    }

    pub fn persistence_mode(&self) -> PersistenceMode {
        if self.snapshot {
            PersistenceMode::Snapshot {
                path: self.snapshot_path.clone(),
                interval: self.snapshot_interval(),
            }
        } else {
            PersistenceMode::Disabled
        }
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            partial_request_timeout: Duration::from_millis(self.partial_request_timeout),
            max_request_size: self.max_request_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "127.0.0.1:6379");
        assert_eq!(config.persistence_mode(), PersistenceMode::Disabled);
        assert_eq!(config.connection_config(), ConnectionConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_slice(br#"{"snapshot": true, "snapshotInterval": 500}"#).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(
            config.persistence_mode(),
            PersistenceMode::Snapshot {
                path: PathBuf::from("data.rdb"),
                interval: Duration::from_millis(500),
            }
        );
    }

    #[test]
    fn test_all_keys() {
        let config = Config::from_slice(
            br#"{
                "host": "0.0.0.0",
                "port": 7000,
                "snapshot": false,
                "snapshotInterval": 1000,
                "snapshotPath": "/tmp/kv.rdb",
                "partialRequestTimeout": 40,
                "maxRequestSize": 1024
            }"#,
        )
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:7000");
        assert_eq!(
            config.connection_config(),
            ConnectionConfig {
                partial_request_timeout: Duration::from_millis(40),
                max_request_size: 1024,
            }
        );
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(Config::from_slice(br#"{"snapshots": true}"#).is_err());
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = Config {
            snapshot_interval: 0,
            ..Config::default()
        };
        assert_eq!(config.snapshot_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"port": 6380}"#).unwrap();
        assert_eq!(Config::from_file(file.path()).unwrap().port, 6380);
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.json");
        assert!(matches!(
            Config::from_file(&missing),
            Err(ConfigError::Io { .. })
        ));

        std::fs::write(&missing, b"{ not json").unwrap();
        assert!(matches!(
            Config::from_file(&missing),
            Err(ConfigError::Json { .. })
        ));
    }
}
