//! SQLite key/value backend for ChainRelay.
//!
//! Persists the checkpoint slot to a single SQLite file through `sqlx`.
//!
//! # Usage
//! ```rust,no_run
//! use chainrelay_storage::sqlite::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStore::open("./relay.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStore::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use chainrelay_core::checkpoint::KeyValueStore;
use chainrelay_core::error::RelayError;

fn storage_err(e: sqlx::Error) -> RelayError {
    RelayError::Storage(e.to_string())
}

/// SQLite-backed key/value store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./relay.db"`) or a full
    /// SQLite URL (`"sqlite:./relay.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, RelayError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url).await.map_err(storage_err)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Limited to one connection: every connection would otherwise get its
    /// own empty database.
    pub async fn in_memory() -> Result<Self, RelayError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_err)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create the `kv` table and enable WAL mode.
    async fn init_schema(&self) -> Result<(), RelayError> {
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv (
                key        TEXT    NOT NULL PRIMARY KEY,
                value      TEXT    NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    /// Unix timestamp of the last write to `key`.
    pub async fn updated_at(&self, key: &str) -> Result<Option<i64>, RelayError> {
        let row = sqlx::query("SELECT updated_at FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.map(|r| r.get::<i64, _>("updated_at")))
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, RelayError> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RelayError> {
        sqlx::query(
            "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!(key, value, "kv entry saved");
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chainrelay_core::checkpoint::CheckpointStore;

    #[tokio::test]
    async fn missing_key_returns_none() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(store.get("lastProcessedBlock").await.unwrap().is_none());
        assert!(store.updated_at("lastProcessedBlock").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_overwrites() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.set("k", "100").await.unwrap();
        store.set("k", "200").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("200"));
        assert!(store.updated_at("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn checkpoint_through_sqlite() {
        let cp = CheckpointStore::new(SqliteStore::in_memory().await.unwrap(), "cp");
        assert_eq!(cp.load(7).await.unwrap(), 7);
        cp.commit(1_234).await.unwrap();
        assert_eq!(cp.load(7).await.unwrap(), 1_234);
    }
}
