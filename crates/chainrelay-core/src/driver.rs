//! The relay driver: runs one execution end to end.
//!
//! ```text
//! ResolveChain → LoadCheckpoint → ComputeHead ─┬─ NoOp
//!                                              └─ Scanning ─┬─ ScanFailed
//!                                                           └─ Aggregating ─┬─ EmptyResult
//!                                                                           └─ Publishing ─┬─ PublishFailed
//!                                                                                          └─ Committed
//! ```
//!
//! Only `Committed` writes the checkpoint, and only after the publish call
//! returned successfully. Every other terminal leaves it untouched, so a
//! failed execution is simply repeated by the next one.

use crate::chain::ChainQuery;
use crate::checkpoint::{CheckpointStore, KeyValueStore};
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::event::normalize_all;
use crate::outcome::{ExecOutcome, ExecState, RelayReport};
use crate::publish::Publisher;
use crate::scanner::RangeScanner;

/// Orchestrates scan → normalize → publish → commit for one execution.
pub struct RelayDriver<C, P, S> {
    config: RelayConfig,
    chain: C,
    publisher: P,
    checkpoint: CheckpointStore<S>,
    scanner: RangeScanner,
}

impl<C, P, S> RelayDriver<C, P, S>
where
    C: ChainQuery,
    P: Publisher,
    S: KeyValueStore,
{
    /// Build a driver; fails if the configuration is unusable.
    pub fn new(config: RelayConfig, chain: C, publisher: P, store: S) -> Result<Self, RelayError> {
        config.validate()?;
        let checkpoint = CheckpointStore::new(store, config.checkpoint_key.clone());
        let scanner = RangeScanner::new(
            config.max_range_per_query,
            config.max_queries_per_execution,
        );
        Ok(Self {
            config,
            chain,
            publisher,
            checkpoint,
            scanner,
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn checkpoint_store(&self) -> &CheckpointStore<S> {
        &self.checkpoint
    }

    /// Run one execution. Never fails: every error becomes a report.
    pub async fn run_once(&self) -> RelayReport {
        let report = self.execute().await;
        match report.state {
            ExecState::Committed => tracing::info!(
                chain_id = ?report.chain_id,
                from = ?report.checkpoint_before,
                to = ?report.checkpoint_after,
                published = report.published,
                "Execution committed"
            ),
            state if state.is_failure() => tracing::warn!(
                %state,
                reason = report.outcome.message.as_deref().unwrap_or_default(),
                "Execution failed, checkpoint unchanged"
            ),
            state => tracing::info!(
                %state,
                reason = report.outcome.message.as_deref().unwrap_or_default(),
                "Nothing to relay"
            ),
        }
        report
    }

    async fn execute(&self) -> RelayReport {
        // ResolveChain
        let chain_id = match self.chain.chain_id().await {
            Ok(id) => id,
            Err(e) => return RelayReport::new(ExecState::ChainUnavailable, rpc_failed(&e)),
        };
        let contract = match self.config.contracts.resolve(chain_id) {
            Ok(addr) => addr,
            Err(e) => {
                let mut report = RelayReport::new(ExecState::UnknownChain, ExecOutcome::skip(e.to_string()));
                report.chain_id = Some(chain_id);
                return report;
            }
        };

        // LoadCheckpoint
        let checkpoint = match self.checkpoint.load(self.config.default_start_block).await {
            Ok(cp) => cp,
            Err(e) => {
                let mut report = RelayReport::new(
                    ExecState::CheckpointUnavailable,
                    ExecOutcome::skip(format!("Checkpoint load failed: {e}")),
                );
                report.chain_id = Some(chain_id);
                return report;
            }
        };
        tracing::info!(chain_id, contract, block = checkpoint, "Last processed block");

        let mut report = RelayReport::new(ExecState::NoOp, ExecOutcome::skip(""));
        report.chain_id = Some(chain_id);
        report.checkpoint_before = Some(checkpoint);
        report.checkpoint_after = Some(checkpoint);

        // ComputeHead
        let head = match self.chain.block_number().await {
            Ok(height) => height.saturating_sub(self.config.head_safety_margin),
            Err(e) => {
                report.state = ExecState::ChainUnavailable;
                report.outcome = rpc_failed(&e);
                return report;
            }
        };
        report.head = Some(head);
        tracing::info!(head, "Current block");

        if checkpoint >= head {
            report.outcome = ExecOutcome::skip("No new block to process");
            return report;
        }

        // Scanning
        let scan = match self.scanner.scan(&self.chain, contract, checkpoint, head).await {
            Ok(scan) => scan,
            Err(e) => {
                report.state = ExecState::ScanFailed;
                report.queries = e.completed.len() + 1;
                report.outcome = rpc_failed(&e.error);
                return report;
            }
        };
        report.queries = scan.queries();

        // Aggregating
        let events = normalize_all(&scan.events);
        tracing::info!(
            events = events.len(),
            from = checkpoint + 1,
            to = scan.reached_block,
            "Events fetched"
        );
        if events.is_empty() {
            report.state = ExecState::EmptyResult;
            report.outcome = ExecOutcome::skip("No new event found");
            return report;
        }

        // Publishing
        match self.publisher.publish(&events).await {
            Ok(response) => {
                tracing::debug!(%response, "Publish response");
            }
            Err(e) => {
                report.state = ExecState::PublishFailed;
                report.outcome = ExecOutcome::skip(e.to_string());
                return report;
            }
        }
        report.published = events.len();

        // Committed
        if let Err(e) = self.checkpoint.commit(scan.reached_block).await {
            report.state = ExecState::CommitFailed;
            report.outcome = ExecOutcome::skip(format!("Checkpoint commit failed: {e}"));
            return report;
        }
        report.state = ExecState::Committed;
        report.checkpoint_after = Some(scan.reached_block);
        report.outcome = ExecOutcome::executed();
        report
    }
}

/// `"Rpc call failed: {reason}"`, without the error's own category prefix.
fn rpc_failed(e: &RelayError) -> ExecOutcome {
    let reason = match e {
        RelayError::ChainQuery(msg) => msg.clone(),
        other => other.to_string(),
    };
    ExecOutcome::skip(format!("Rpc call failed: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryStore;
    use crate::event::{EventKind, NormalizedEvent, RawEvent};
    use async_trait::async_trait;
    use serde_json::Value;

    struct FixedChain {
        chain_id: u64,
        height: u64,
    }

    #[async_trait]
    impl ChainQuery for FixedChain {
        async fn chain_id(&self) -> Result<u64, RelayError> {
            Ok(self.chain_id)
        }

        async fn block_number(&self) -> Result<u64, RelayError> {
            Ok(self.height)
        }

        async fn query_events(
            &self,
            contract: &str,
            _kinds: &[EventKind],
            from: u64,
            _to: u64,
        ) -> Result<Vec<RawEvent>, RelayError> {
            Ok(vec![RawEvent {
                kind: EventKind::Deposit,
                chain_id: self.chain_id,
                address: contract.to_string(),
                block_number: from,
                block_hash: "0x0".into(),
                tx_hash: "0x1".into(),
                log_index: 0,
                args: Default::default(),
            }])
        }
    }

    /// A node whose `eth_chainId` or `eth_blockNumber` call fails.
    struct BrokenChain {
        chain_id_fails: bool,
    }

    #[async_trait]
    impl ChainQuery for BrokenChain {
        async fn chain_id(&self) -> Result<u64, RelayError> {
            if self.chain_id_fails {
                Err(RelayError::ChainQuery("connection refused".into()))
            } else {
                Ok(1)
            }
        }

        async fn block_number(&self) -> Result<u64, RelayError> {
            Err(RelayError::ChainQuery("header not found".into()))
        }

        async fn query_events(
            &self,
            _contract: &str,
            _kinds: &[EventKind],
            _from: u64,
            _to: u64,
        ) -> Result<Vec<RawEvent>, RelayError> {
            unreachable!("no scan without a head")
        }
    }

    struct AcceptAll;

    #[async_trait]
    impl Publisher for AcceptAll {
        async fn publish(&self, _events: &[NormalizedEvent]) -> Result<Value, RelayError> {
            Ok(Value::Null)
        }
    }

    fn config() -> RelayConfig {
        crate::config::RelayConfigBuilder::new()
            .contract(1, "0xlocker")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn unknown_chain_is_fatal() {
        let driver = RelayDriver::new(
            config(),
            FixedChain { chain_id: 999, height: 100 },
            AcceptAll,
            MemoryStore::new(),
        )
        .unwrap();

        let report = driver.run_once().await;
        assert_eq!(report.state, ExecState::UnknownChain);
        assert_eq!(report.outcome, ExecOutcome::skip("Unknown chain id 999"));
        assert_eq!(driver.checkpoint_store().store().get("lastProcessedBlock").await.unwrap(), None);
    }

    #[tokio::test]
    async fn head_keeps_safety_margin() {
        let driver = RelayDriver::new(
            config(),
            FixedChain { chain_id: 1, height: 51 },
            AcceptAll,
            MemoryStore::new(),
        )
        .unwrap();

        let report = driver.run_once().await;
        assert_eq!(report.head, Some(50));
        assert_eq!(report.state, ExecState::Committed);
        assert_eq!(report.checkpoint_after, Some(50));
        assert_eq!(report.outcome, ExecOutcome::executed());
    }

    #[tokio::test]
    async fn checkpoint_at_head_is_noop() {
        let driver = RelayDriver::new(
            config(),
            FixedChain { chain_id: 1, height: 101 },
            AcceptAll,
            MemoryStore::with_entry("lastProcessedBlock", "100"),
        )
        .unwrap();

        let report = driver.run_once().await;
        assert_eq!(report.state, ExecState::NoOp);
        assert_eq!(report.queries, 0);
        assert!(!report.outcome.can_exec);
    }

    #[tokio::test]
    async fn invalid_config_rejected() {
        let mut cfg = config();
        cfg.max_range_per_query = 0;
        let result = RelayDriver::new(
            cfg,
            FixedChain { chain_id: 1, height: 10 },
            AcceptAll,
            MemoryStore::new(),
        );
        assert!(matches!(result, Err(RelayError::Config(_))));
    }

    #[tokio::test]
    async fn chain_id_failure_is_chain_unavailable() {
        let driver = RelayDriver::new(
            config(),
            BrokenChain { chain_id_fails: true },
            AcceptAll,
            MemoryStore::with_entry("lastProcessedBlock", "700"),
        )
        .unwrap();

        let report = driver.run_once().await;
        assert_eq!(report.state, ExecState::ChainUnavailable);
        assert_eq!(
            report.outcome,
            ExecOutcome::skip("Rpc call failed: connection refused")
        );
        assert_eq!(report.chain_id, None);
        assert_eq!(
            driver.checkpoint_store().store().get("lastProcessedBlock").await.unwrap().as_deref(),
            Some("700")
        );
    }

    #[tokio::test]
    async fn block_number_failure_is_chain_unavailable() {
        let driver = RelayDriver::new(
            config(),
            BrokenChain { chain_id_fails: false },
            AcceptAll,
            MemoryStore::with_entry("lastProcessedBlock", "700"),
        )
        .unwrap();

        let report = driver.run_once().await;
        assert_eq!(report.state, ExecState::ChainUnavailable);
        assert_eq!(report.outcome, ExecOutcome::skip("Rpc call failed: header not found"));
        assert_eq!(report.checkpoint_before, Some(700));
        assert_eq!(report.checkpoint_after, Some(700));
        assert_eq!(report.head, None);
        assert_eq!(
            driver.checkpoint_store().store().get("lastProcessedBlock").await.unwrap().as_deref(),
            Some("700")
        );
    }

    #[tokio::test]
    async fn unparsable_checkpoint_is_checkpoint_unavailable() {
        let driver = RelayDriver::new(
            config(),
            FixedChain { chain_id: 1, height: 500 },
            AcceptAll,
            MemoryStore::with_entry("lastProcessedBlock", "garbage"),
        )
        .unwrap();

        let report = driver.run_once().await;
        assert_eq!(report.state, ExecState::CheckpointUnavailable);
        assert_eq!(report.chain_id, Some(1));
        assert_eq!(report.queries, 0);
        let message = report.outcome.message.unwrap();
        assert!(message.starts_with("Checkpoint load failed:"), "{message}");
        assert!(message.contains("garbage"), "{message}");
        assert_eq!(
            driver.checkpoint_store().store().get("lastProcessedBlock").await.unwrap().as_deref(),
            Some("garbage")
        );
    }

    #[tokio::test]
    async fn start_block_ahead_of_tip_is_noop() {
        let mut cfg = config();
        cfg.default_start_block = 5_000;
        let driver = RelayDriver::new(
            cfg,
            FixedChain { chain_id: 1, height: 1_000 },
            AcceptAll,
            MemoryStore::new(),
        )
        .unwrap();

        let report = driver.run_once().await;
        assert_eq!(report.state, ExecState::NoOp);
        assert_eq!(report.outcome, ExecOutcome::skip("No new block to process"));
        assert_eq!(report.checkpoint_after, Some(5_000));
        assert_eq!(report.queries, 0);
        assert_eq!(
            driver.checkpoint_store().store().get("lastProcessedBlock").await.unwrap(),
            None
        );
    }
}
