use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration, loaded from `gantry.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite store.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Busy timeout in milliseconds for store connections.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How long a settled tracker waits before polling the log again.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("gantry.sqlite3")
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

const fn default_poll_interval_ms() -> u64 {
    500
}

impl CoreConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_missing() {
        let config = CoreConfig::load(Path::new("/nonexistent/gantry.toml")).expect("load");
        assert_eq!(config.store.busy_timeout_ms, 5_000);
        assert_eq!(config.sync.poll_interval_ms, 500);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gantry.toml");
        std::fs::write(&path, "[sync]\npoll_interval_ms = 50\n").expect("write");

        let config = CoreConfig::load(&path).expect("load");
        assert_eq!(config.sync.poll_interval_ms, 50);
        assert_eq!(config.store.path, PathBuf::from("gantry.sqlite3"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gantry.toml");
        std::fs::write(&path, "store = nonsense [").expect("write");
        assert!(CoreConfig::load(&path).is_err());
    }
}
