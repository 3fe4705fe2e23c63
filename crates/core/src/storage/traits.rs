use crate::errors::CoreError;

/// Raw key/value persistence backend.
///
/// Values are opaque strings (JSON text in practice). Backends report every
/// failure as a `CoreError`; downgrading to defaults happens one layer up in
/// `PersistentStore`, never here.
pub trait KeyValueStore: Send + Sync {
    /// Human-readable name of this backend (for logs/errors).
    fn name(&self) -> &str;

    /// Read the value stored under `key`. A missing key is `Ok(None)`.
    fn read(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &str) -> Result<(), CoreError>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), CoreError>;
}
