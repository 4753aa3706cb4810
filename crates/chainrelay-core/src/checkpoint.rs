//! Checkpoint store adapter: persists the relay's "last processed block".
//!
//! The hosting runtime exposes a plain string key/value store. The checkpoint
//! lives under a single key as the decimal string form of the block number.
//! On each execution the driver loads it once and commits it at most once,
//! after the downstream publish succeeded.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::RelayError;

/// Default key of the checkpoint slot.
pub const DEFAULT_CHECKPOINT_KEY: &str = "lastProcessedBlock";

/// String key/value store supplied by the hosting runtime.
///
/// Implementations include `MemoryStore`, `JsonFileStore` and `SqliteStore`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, RelayError>;

    /// Store `value` under `key`, overwriting any prior value.
    async fn set(&self, key: &str, value: &str) -> Result<(), RelayError>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, RelayError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RelayError> {
        (**self).set(key, value).await
    }
}

/// Reads and writes the checkpoint through a `KeyValueStore`.
pub struct CheckpointStore<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> CheckpointStore<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// The key the checkpoint is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the stored checkpoint, or `default` on the first-ever execution.
    pub async fn load(&self, default: u64) -> Result<u64, RelayError> {
        match self.store.get(&self.key).await? {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| RelayError::InvalidCheckpoint {
                    key: self.key.clone(),
                    value: raw,
                }),
            None => Ok(default),
        }
    }

    /// Durably store `block_number`, overwriting the prior checkpoint.
    ///
    /// A failed write is returned as-is and never retried here.
    pub async fn commit(&self, block_number: u64) -> Result<(), RelayError> {
        self.store.set(&self.key, &block_number.to_string()).await?;
        tracing::debug!(key = %self.key, block = block_number, "Checkpoint committed");
        Ok(())
    }
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

/// In-memory key/value store for tests and ephemeral relays.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a single entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::default();
        store.data.lock().unwrap().insert(key.into(), value.into());
        store
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, RelayError> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RelayError> {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
