//! `eth_getLogs` wire types.

use serde::{Deserialize, Serialize};

use chainrelay_core::error::RelayError;

/// A raw EVM log as returned by `eth_getLogs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    #[serde(rename = "data")]
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "blockHash")]
    pub block_hash: String,
    #[serde(rename = "transactionHash")]
    pub tx_hash: String,
    #[serde(rename = "logIndex")]
    pub log_index: String,
    #[serde(rename = "removed")]
    pub removed: Option<bool>,
}

impl RawLog {
    /// Returns the block number as u64.
    pub fn block_number_u64(&self) -> Result<u64, RelayError> {
        parse_hex_u64(&self.block_number)
    }

    /// Returns the log index as u32.
    pub fn log_index_u32(&self) -> Result<u32, RelayError> {
        let index = parse_hex_u64(&self.log_index)?;
        u32::try_from(index)
            .map_err(|_| RelayError::ChainQuery(format!("log index out of range: {index}")))
    }

    /// Returns `true` if this log was removed by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }

    /// The event signature hash, if any.
    pub fn topic0(&self) -> Option<&str> {
        self.topics.first().map(String::as_str)
    }
}

/// Parse a hex-encoded quantity (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> Result<u64, RelayError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|e| RelayError::ChainQuery(format!("invalid hex quantity {s:?}: {e}")))
}

/// Encode a block number as a JSON-RPC quantity.
pub fn to_hex_quantity(n: u64) -> String {
    format!("{n:#x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_u64_basic() {
        assert_eq!(parse_hex_u64("0x1").unwrap(), 1);
        assert_eq!(parse_hex_u64("0xff").unwrap(), 255);
        assert_eq!(parse_hex_u64("1234").unwrap(), 0x1234);
        assert!(parse_hex_u64("0xzz").is_err());
    }

    #[test]
    fn hex_quantity() {
        assert_eq!(to_hex_quantity(0), "0x0");
        assert_eq!(to_hex_quantity(255), "0xff");
    }

    #[test]
    fn raw_log_from_rpc_json() {
        let log: RawLog = serde_json::from_value(serde_json::json!({
            "address": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
            "topics": ["0xabc"],
            "data": "0x",
            "blockNumber": "0x12a05f200",
            "blockHash": "0x01",
            "transactionHash": "0x02",
            "logIndex": "0x5",
            "removed": false
        }))
        .unwrap();
        assert_eq!(log.block_number_u64().unwrap(), 5_000_000_000);
        assert_eq!(log.log_index_u32().unwrap(), 5);
        assert_eq!(log.topic0(), Some("0xabc"));
        assert!(!log.is_removed());
    }
}
