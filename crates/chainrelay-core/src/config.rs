//! Relay configuration.

use serde::{Deserialize, Serialize};

use crate::chain::ContractRegistry;
use crate::checkpoint::DEFAULT_CHECKPOINT_KEY;
use crate::error::RelayError;

/// Configuration for one relay instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelayConfig {
    /// Maximum number of blocks per `eth_getLogs` call.
    /// Keeps each query within RPC provider limits.
    pub max_range_per_query: u64,
    /// Maximum number of chain queries per execution.
    /// Keeps one execution within the hosting runtime's time limit.
    pub max_queries_per_execution: u32,
    /// URL the normalized batch is POSTed to.
    pub publish_endpoint: String,
    /// Checkpoint used when none has been stored yet.
    pub default_start_block: u64,
    /// Logical stream the events are published into.
    pub stream_id: String,
    /// Blocks kept between the chain tip and the scanned head.
    pub head_safety_margin: u64,
    /// Key of the checkpoint slot in the key/value store.
    pub checkpoint_key: String,
    /// Locker contract address per chain id.
    pub contracts: ContractRegistry,
    /// Timeout for every outbound HTTP request (milliseconds).
    pub request_timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_range_per_query: 100,
            max_queries_per_execution: 9,
            publish_endpoint: "http://localhost:3000/publish".into(),
            default_start_block: 0,
            stream_id: String::new(),
            head_safety_margin: 1,
            checkpoint_key: DEFAULT_CHECKPOINT_KEY.into(),
            contracts: ContractRegistry::default(),
            request_timeout_ms: 30_000,
        }
    }
}

impl RelayConfig {
    /// Reject configurations the scanner cannot make progress with.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.max_range_per_query == 0 {
            return Err(RelayError::Config("maxRangePerQuery must be at least 1".into()));
        }
        if self.max_queries_per_execution == 0 {
            return Err(RelayError::Config(
                "maxQueriesPerExecution must be at least 1".into(),
            ));
        }
        if self.publish_endpoint.trim().is_empty() {
            return Err(RelayError::Config("publishEndpoint must not be empty".into()));
        }
        if self.checkpoint_key.is_empty() {
            return Err(RelayError::Config("checkpointKey must not be empty".into()));
        }
        Ok(())
    }

    /// Blocks covered per execution when every query succeeds.
    pub fn blocks_per_execution(&self) -> u64 {
        self.max_range_per_query
            .saturating_mul(self.max_queries_per_execution as u64)
    }
}

/// Fluent builder for `RelayConfig`.
///
/// ```rust
/// use chainrelay_core::config::RelayConfigBuilder;
///
/// let config = RelayConfigBuilder::new()
///     .contract(137, "0x5FbDB2315678afecb367f032d93F642f64180aa3")
///     .default_start_block(48_000_000)
///     .max_range_per_query(500)
///     .build()
///     .unwrap();
/// assert_eq!(config.blocks_per_execution(), 4500);
/// ```
#[derive(Default)]
pub struct RelayConfigBuilder {
    config: RelayConfig,
}

impl RelayConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
        }
    }

    pub fn max_range_per_query(mut self, blocks: u64) -> Self {
        self.config.max_range_per_query = blocks;
        self
    }

    pub fn max_queries_per_execution(mut self, queries: u32) -> Self {
        self.config.max_queries_per_execution = queries;
        self
    }

    pub fn publish_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.publish_endpoint = url.into();
        self
    }

    pub fn default_start_block(mut self, block: u64) -> Self {
        self.config.default_start_block = block;
        self
    }

    pub fn stream_id(mut self, id: impl Into<String>) -> Self {
        self.config.stream_id = id.into();
        self
    }

    pub fn head_safety_margin(mut self, blocks: u64) -> Self {
        self.config.head_safety_margin = blocks;
        self
    }

    pub fn checkpoint_key(mut self, key: impl Into<String>) -> Self {
        self.config.checkpoint_key = key.into();
        self
    }

    /// Register the Locker address for a chain id.
    pub fn contract(mut self, chain_id: u64, address: impl Into<String>) -> Self {
        self.config.contracts = self.config.contracts.with(chain_id, address);
        self
    }

    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config.request_timeout_ms = ms;
        self
    }

    /// Validate and return the `RelayConfig`.
    pub fn build(self) -> Result<RelayConfig, RelayError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.max_range_per_query, 100);
        assert_eq!(cfg.max_queries_per_execution, 9);
        assert_eq!(cfg.publish_endpoint, "http://localhost:3000/publish");
        assert_eq!(cfg.head_safety_margin, 1);
        assert_eq!(cfg.blocks_per_execution(), 900);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn builder_custom() {
        let cfg = RelayConfigBuilder::new()
            .max_range_per_query(50)
            .max_queries_per_execution(3)
            .publish_endpoint("https://ingest.example/publish")
            .default_start_block(1_000)
            .stream_id("0xstream/locker")
            .contract(1, "0xabc")
            .build()
            .unwrap();
        assert_eq!(cfg.max_range_per_query, 50);
        assert_eq!(cfg.default_start_block, 1_000);
        assert_eq!(cfg.contracts.resolve(1).unwrap(), "0xabc");
    }

    #[test]
    fn zero_budgets_are_rejected() {
        assert!(RelayConfigBuilder::new().max_range_per_query(0).build().is_err());
        assert!(RelayConfigBuilder::new()
            .max_queries_per_execution(0)
            .build()
            .is_err());
        assert!(RelayConfigBuilder::new().publish_endpoint(" ").build().is_err());
    }

    #[test]
    fn deserialize_partial_json() {
        let cfg: RelayConfig = serde_json::from_str(
            r#"{"defaultStartBlock": 42, "streamId": "s", "contracts": {"5": "0xdef"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.default_start_block, 42);
        assert_eq!(cfg.max_range_per_query, 100);
        assert_eq!(cfg.contracts.resolve(5).unwrap(), "0xdef");
    }
}
