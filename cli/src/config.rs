//! Config file loading for the `chainrelay` binary.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chainrelay_core::checkpoint::KeyValueStore;
use chainrelay_core::RelayConfig;
use chainrelay_storage::{JsonFileStore, MemoryStore, SqliteStore};

use crate::logging::LogConfig;

/// Environment variable overriding `rpcUrl`.
pub const RPC_URL_ENV: &str = "CHAINRELAY_RPC_URL";

/// Where the checkpoint lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Lost when the process exits. Useful for dry runs.
    Memory,
    File { path: PathBuf },
    Sqlite { path: String },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::File {
            path: PathBuf::from("chainrelay-checkpoint.json"),
        }
    }
}

impl StorageConfig {
    /// Open the configured backend.
    pub async fn open(&self) -> Result<Arc<dyn KeyValueStore>> {
        Ok(match self {
            StorageConfig::Memory => Arc::new(MemoryStore::new()),
            StorageConfig::File { path } => Arc::new(JsonFileStore::new(path)),
            StorageConfig::Sqlite { path } => Arc::new(
                SqliteStore::open(path)
                    .await
                    .with_context(|| format!("opening sqlite store at {path}"))?,
            ),
        })
    }
}

/// Everything one `chainrelay` invocation needs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayFileConfig {
    #[serde(flatten)]
    pub relay: RelayConfig,
    /// JSON-RPC endpoint of the chain node.
    #[serde(default)]
    pub rpc_url: String,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl RelayFileConfig {
    /// Read `path`, apply the environment override and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config = Self::parse(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.apply_rpc_override(std::env::var(RPC_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Replace `rpcUrl` with a non-empty override.
    pub fn apply_rpc_override(&mut self, rpc_url: Option<String>) {
        if let Some(url) = rpc_url.filter(|u| !u.trim().is_empty()) {
            self.rpc_url = url;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.relay.validate()?;
        if self.rpc_url.trim().is_empty() {
            bail!("rpcUrl is not set (config file or {RPC_URL_ENV})");
        }
        if self.relay.contracts.is_empty() {
            bail!("no Locker contract configured under `contracts`");
        }
        Ok(())
    }
}
