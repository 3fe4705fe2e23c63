use std::sync::Arc;

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::CoreError;

use super::memory::MemoryStore;
use super::traits::KeyValueStore;

/// Storage key holding the JSON array of price alerts.
pub const ALERTS_KEY: &str = "priceAlerts";

/// Storage key holding the theme preference string.
pub const THEME_KEY: &str = "theme";

/// Typed JSON persistence over any `KeyValueStore`.
///
/// Two layers of API:
/// - `try_*` return `Result` and surface every backend or encoding failure.
/// - `get` / `set` / `remove` are the best-effort boundary: failures are
///   logged and degrade to the caller's default on read, or a dropped write.
///   In-memory state stays authoritative when durability is lost.
///
/// Cloning is cheap; all clones share one backend.
#[derive(Clone)]
pub struct PersistentStore {
    backend: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for PersistentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentStore")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl PersistentStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn from_arc(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    // ── Fallible API ────────────────────────────────────────────────

    /// Read and decode the value under `key`. Missing key is `Ok(None)`.
    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CoreError> {
        let Some(raw) = self.backend.read(key)? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&raw).map_err(|e| {
            CoreError::Deserialization(format!("Corrupt value under '{key}': {e}"))
        })?;
        Ok(Some(value))
    }

    /// Encode `value` as JSON and store it under `key`.
    pub fn try_set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CoreError> {
        let raw = serde_json::to_string(value).map_err(|e| {
            CoreError::Serialization(format!("Failed to encode value for '{key}': {e}"))
        })?;
        self.backend.write(key, &raw)
    }

    pub fn try_remove(&self, key: &str) -> Result<(), CoreError> {
        self.backend.delete(key)
    }

    // ── Best-effort API ─────────────────────────────────────────────

    /// Read `key`, returning `default` when it is missing, unreadable, or corrupt.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.try_get(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                warn!("Reading '{key}' from {} store failed, using default: {e}", self.backend.name());
                default
            }
        }
    }

    /// Write `key`, logging and dropping the write on failure.
    /// Returns whether the value reached durable storage.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match self.try_set(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!("Writing '{key}' to {} store failed, change kept in memory only: {e}", self.backend.name());
                false
            }
        }
    }

    /// Remove `key`, logging on failure.
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.try_remove(key) {
            warn!("Removing '{key}' from {} store failed: {e}", self.backend.name());
        }
    }
}
