//! Store configuration.

use pawtrack_storage::SyncPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default time a logging flow waits for a location reading.
pub const DEFAULT_LOCATION_TIMEOUT_MS: u64 = 5_000;

/// Where committed changes are kept.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Nothing survives the process.
    #[default]
    Memory,
    /// JSON-lines append log at `path`.
    AppendLog {
        path: PathBuf,
        #[serde(default)]
        sync: SyncPolicy,
    },
}

/// Configuration of a `Database`.
///
/// Deserializes from any serde format; missing fields take their defaults.
///
/// ```rust
/// use pawtrack::StoreConfig;
///
/// let config: StoreConfig = serde_json::from_str(
///     r#"{ "backend": { "kind": "append_log", "path": "pawtrack.log" } }"#,
/// ).unwrap();
/// assert_eq!(config.location_timeout_ms, 5000);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    /// How long a logging flow waits for a location reading, in milliseconds.
    pub location_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::Memory,
            location_timeout_ms: DEFAULT_LOCATION_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Persists to an append log at `path`, syncing every write.
    pub fn append_log(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendConfig::AppendLog {
                path: path.into(),
                sync: SyncPolicy::default(),
            },
            ..Self::default()
        }
    }

    /// Sets the sync policy. No effect on the memory backend.
    pub fn with_sync(mut self, policy: SyncPolicy) -> Self {
        if let BackendConfig::AppendLog { sync, .. } = &mut self.backend {
            *sync = policy;
        }
        self
    }

    pub fn with_location_timeout(mut self, timeout: Duration) -> Self {
        self.location_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[inline]
    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location_timeout_ms)
    }
}
