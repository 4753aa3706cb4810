//! Chain-query collaborator and contract resolution.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RelayError;
use crate::event::{EventKind, RawEvent};

/// Trait for reading Locker events from a chain.
///
/// Every method is a single request/response call; failures are reported as
/// `RelayError::ChainQuery`.
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// The EVM chain id of the connected network.
    async fn chain_id(&self) -> Result<u64, RelayError>;

    /// The current chain height.
    async fn block_number(&self) -> Result<u64, RelayError>;

    /// All events of the given kinds emitted by `contract` in `[from, to]`.
    async fn query_events(
        &self,
        contract: &str,
        kinds: &[EventKind],
        from: u64,
        to: u64,
    ) -> Result<Vec<RawEvent>, RelayError>;
}

#[async_trait]
impl<T: ChainQuery + ?Sized> ChainQuery for std::sync::Arc<T> {
    async fn chain_id(&self) -> Result<u64, RelayError> {
        (**self).chain_id().await
    }

    async fn block_number(&self) -> Result<u64, RelayError> {
        (**self).block_number().await
    }

    async fn query_events(
        &self,
        contract: &str,
        kinds: &[EventKind],
        from: u64,
        to: u64,
    ) -> Result<Vec<RawEvent>, RelayError> {
        (**self).query_events(contract, kinds, from, to).await
    }
}

/// Locker contract address per chain id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractRegistry {
    addresses: BTreeMap<u64, String>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the Locker address for `chain_id`.
    pub fn with(mut self, chain_id: u64, address: impl Into<String>) -> Self {
        self.addresses.insert(chain_id, address.into());
        self
    }

    /// Resolve the Locker address for `chain_id`.
    pub fn resolve(&self, chain_id: u64) -> Result<&str, RelayError> {
        self.addresses
            .get(&chain_id)
            .map(String::as_str)
            .ok_or(RelayError::UnknownChain { chain_id })
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Iterate over `(chain_id, address)` pairs in chain-id order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.addresses.iter().map(|(id, addr)| (*id, addr.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_known_chain() {
        let reg = ContractRegistry::new().with(137, "0xLocker");
        assert_eq!(reg.resolve(137).unwrap(), "0xLocker");
    }

    #[test]
    fn resolve_unknown_chain() {
        let reg = ContractRegistry::new().with(1, "0xLocker");
        let err = reg.resolve(5).unwrap_err();
        assert!(matches!(err, RelayError::UnknownChain { chain_id: 5 }));
    }

    #[test]
    fn registry_deserializes_from_object() {
        let reg: ContractRegistry =
            serde_json::from_str(r#"{"1":"0xaaa","80001":"0xbbb"}"#).unwrap();
        assert_eq!(reg.resolve(80001).unwrap(), "0xbbb");
        assert_eq!(reg.iter().count(), 2);
    }
}
