//! Error types for the relay pipeline.

use thiserror::Error;

/// Errors that can occur while relaying events.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("RPC error: {0}")]
    ChainQuery(String),

    #[error("Unknown chain id {chain_id}")]
    UnknownChain { chain_id: u64 },

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid checkpoint under '{key}': {value:?}")]
    InvalidCheckpoint { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl RelayError {
    /// Returns `true` if the error came from the chain-query collaborator.
    pub fn is_chain_query(&self) -> bool {
        matches!(self, Self::ChainQuery(_))
    }

    /// Returns `true` if the error came from the downstream publisher.
    pub fn is_publish(&self) -> bool {
        matches!(self, Self::Publish(_))
    }

    /// Returns `true` if the error came from the checkpoint store.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::InvalidCheckpoint { .. })
    }
}
