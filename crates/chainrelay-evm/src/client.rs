//! HTTP JSON-RPC chain client backed by `reqwest`.
//!
//! Implements `ChainQuery` with `eth_chainId`, `eth_blockNumber` and one
//! `eth_getLogs` call per block range. Requests are never retried here; a
//! failed range is picked up again by the next execution.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use chainrelay_core::chain::ChainQuery;
use chainrelay_core::error::RelayError;
use chainrelay_core::event::{EventKind, RawEvent};

use crate::locker::{decode_log, EventDef};
use crate::log::{parse_hex_u64, to_hex_quantity, RawLog};
use crate::rpc::{JsonRpcRequest, JsonRpcResponse};

/// EVM chain client speaking JSON-RPC over HTTP.
pub struct HttpChainClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
    chain_id: OnceLock<u64>,
}

impl HttpChainClient {
    /// Create a client for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            http,
            next_id: AtomicU64::new(1),
            chain_id: OnceLock::new(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call a method and deserialize the result.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RelayError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let req = JsonRpcRequest::new(id, method, params);

        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| RelayError::ChainQuery(format!("{method}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RelayError::ChainQuery(format!(
                "{method}: HTTP {status}: {body}"
            )));
        }

        let resp: JsonRpcResponse = resp
            .json()
            .await
            .map_err(|e| RelayError::ChainQuery(format!("{method}: {e}")))?;
        let result = resp
            .into_result()
            .map_err(|e| RelayError::ChainQuery(format!("{method}: {e}")))?;
        serde_json::from_value(result)
            .map_err(|e| RelayError::ChainQuery(format!("{method}: unexpected result: {e}")))
    }

    /// Fetch raw logs emitted by `contract` with any of `topic0s` in `[from, to]`.
    pub async fn get_logs(
        &self,
        contract: &str,
        topic0s: &[String],
        from: u64,
        to: u64,
    ) -> Result<Vec<RawLog>, RelayError> {
        let filter = log_filter(contract, topic0s, from, to);
        self.call("eth_getLogs", vec![filter]).await
    }
}

/// Build the `eth_getLogs` filter object; `topic0s` are OR-ed in position 0.
pub fn log_filter(contract: &str, topic0s: &[String], from: u64, to: u64) -> Value {
    json!({
        "address": contract,
        "topics": [topic0s],
        "fromBlock": to_hex_quantity(from),
        "toBlock": to_hex_quantity(to),
    })
}

#[async_trait]
impl ChainQuery for HttpChainClient {
    async fn chain_id(&self) -> Result<u64, RelayError> {
        if let Some(id) = self.chain_id.get() {
            return Ok(*id);
        }
        let hex: String = self.call("eth_chainId", vec![]).await?;
        let id = parse_hex_u64(&hex)?;
        Ok(*self.chain_id.get_or_init(|| id))
    }

    async fn block_number(&self) -> Result<u64, RelayError> {
        let hex: String = self.call("eth_blockNumber", vec![]).await?;
        parse_hex_u64(&hex)
    }

    async fn query_events(
        &self,
        contract: &str,
        kinds: &[EventKind],
        from: u64,
        to: u64,
    ) -> Result<Vec<RawEvent>, RelayError> {
        let topic0s: Vec<String> = kinds
            .iter()
            .map(|k| EventDef::for_kind(*k).topic0_hex())
            .collect();
        let chain_id = self.chain_id().await?;
        let logs = self.get_logs(contract, &topic0s, from, to).await?;
        tracing::debug!(from, to, logs = logs.len(), "eth_getLogs returned");

        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            if log.is_removed() {
                continue;
            }
            match decode_log(log, chain_id) {
                Ok(Some(event)) if kinds.contains(&event.kind) => events.push(event),
                Ok(_) => {
                    tracing::warn!(
                        tx = %log.tx_hash,
                        topic0 = log.topic0().unwrap_or_default(),
                        "Skipping unexpected log"
                    );
                }
                Err(e) => {
                    return Err(RelayError::ChainQuery(format!(
                        "undecodable log {}#{}: {e}",
                        log.tx_hash, log.log_index
                    )));
                }
            }
        }
        events.sort_by_key(|e| e.position());
        Ok(events)
    }
}
