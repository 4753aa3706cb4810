//! JSON file key/value backend.
//!
//! All entries live in one JSON object. Every `set` rewrites the whole file
//! through a sibling temp file and a rename, so a crash mid-write leaves the
//! previous contents in place.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use chainrelay_core::checkpoint::KeyValueStore;
use chainrelay_core::error::RelayError;

/// Key/value store persisted as a single JSON object file.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Use the file at `path`. It is created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>, RelayError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(RelayError::Storage(format!(
                    "read {}: {e}",
                    self.path.display()
                )))
            }
        };
        // An existing file always holds at least `{}`; a blank one was torn.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(RelayError::Storage(format!(
                "{} exists but is empty",
                self.path.display()
            )));
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| RelayError::Storage(format!("parse {}: {e}", self.path.display())))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Write `body` to `path` and flush it to disk before returning.
async fn write_synced(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(body).await?;
    file.sync_all().await
}

/// Persist the directory entry created by a rename.
#[cfg(unix)]
async fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, RelayError> {
        let entries = self.read_all().await?;
        Ok(entries.get(key).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RelayError> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.read_all().await?;
        entries.insert(key.to_string(), Value::String(value.to_string()));

        let body = serde_json::to_vec_pretty(&entries)
            .map_err(|e| RelayError::Storage(e.to_string()))?;
        let tmp = self.temp_path();
        write_synced(&tmp, &body)
            .await
            .map_err(|e| RelayError::Storage(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| RelayError::Storage(format!("rename {}: {e}", self.path.display())))?;
        sync_parent_dir(&self.path)
            .await
            .map_err(|e| RelayError::Storage(format!("sync {}: {e}", self.path.display())))?;

        debug!(key, value, path = %self.path.display(), "kv entry saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainrelay_core::checkpoint::CheckpointStore;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "chainrelay-{name}-{}-{nanos}.json",
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let store = JsonFileStore::new(scratch("missing"));
        assert!(store.get("lastProcessedBlock").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_persists_across_instances() {
        let path = scratch("persist");
        JsonFileStore::new(&path).set("a", "1").await.unwrap();
        JsonFileStore::new(&path).set("b", "2").await.unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(reopened.get("b").await.unwrap().as_deref(), Some("2"));
        assert!(!reopened.temp_path().exists());

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn numeric_values_read_back_as_text() {
        let path = scratch("numeric");
        std::fs::write(&path, r#"{"lastProcessedBlock": 1200}"#).unwrap();

        let cp = CheckpointStore::new(JsonFileStore::new(&path), "lastProcessedBlock");
        assert_eq!(cp.load(0).await.unwrap(), 1200);
        cp.commit(1300).await.unwrap();
        assert_eq!(cp.load(0).await.unwrap(), 1300);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn truncated_file_does_not_rewind_checkpoint() {
        let path = scratch("truncated");
        let cp = CheckpointStore::new(JsonFileStore::new(&path), "lastProcessedBlock");
        cp.commit(19_000_900).await.unwrap();
        std::fs::write(&path, "").unwrap();

        let err = cp.load(19_000_000).await.unwrap_err();
        assert!(err.is_storage());

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn corrupt_file_is_a_storage_error() {
        let path = scratch("corrupt");
        std::fs::write(&path, "not json").unwrap();

        let err = JsonFileStore::new(&path).get("k").await.unwrap_err();
        assert!(err.is_storage());

        std::fs::remove_file(&path).ok();
    }
}
