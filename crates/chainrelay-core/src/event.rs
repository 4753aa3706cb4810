//! Raw and normalized Locker events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─── EventKind ────────────────────────────────────────────────────────────────

/// The fixed set of Locker contract events the relay forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// `FundsDeposited`
    Deposit,
    /// `FundsWithdrawn`
    Withdrawal,
    /// `WithdrawCanceled`
    WithdrawalCancellation,
}

impl EventKind {
    /// Every kind, in the order they are requested from the chain.
    pub const ALL: [EventKind; 3] = [
        EventKind::Deposit,
        EventKind::Withdrawal,
        EventKind::WithdrawalCancellation,
    ];

    /// The Solidity event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Deposit => "FundsDeposited",
            Self::Withdrawal => "FundsWithdrawn",
            Self::WithdrawalCancellation => "WithdrawCanceled",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deposit => write!(f, "deposit"),
            Self::Withdrawal => write!(f, "withdrawal"),
            Self::WithdrawalCancellation => write!(f, "withdrawal-cancellation"),
        }
    }
}

// ─── RawEvent ─────────────────────────────────────────────────────────────────

/// A decoded log as returned by the chain-query collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub kind: EventKind,
    /// EVM chain id the log was read from.
    pub chain_id: u64,
    /// Contract address that emitted the event.
    pub address: String,
    pub block_number: u64,
    pub block_hash: String,
    pub tx_hash: String,
    /// Log index within the block.
    pub log_index: u32,
    /// Decoded event arguments, keyed by parameter name.
    pub args: Map<String, Value>,
}

impl RawEvent {
    /// Chain order key: block number, then log index.
    pub fn position(&self) -> (u64, u32) {
        (self.block_number, self.log_index)
    }
}

// ─── NormalizedEvent ──────────────────────────────────────────────────────────

/// The schema the downstream ingestion endpoint expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    /// Stable identifier: `"{txHash}-{logIndex}"`.
    pub id: String,
    /// Chain namespace, e.g. `"ethereum:1"`.
    pub chain: String,
    /// Solidity event name.
    pub event: String,
    pub kind: EventKind,
    pub address: String,
    pub block_number: u64,
    pub block_hash: String,
    pub transaction_hash: String,
    pub log_index: u32,
    pub args: Map<String, Value>,
}

/// Map a raw event into the downstream schema.
///
/// Pure: the same `RawEvent` always yields the same `NormalizedEvent`, which
/// is what makes re-delivery after a failed publish harmless downstream.
pub fn normalize(raw: &RawEvent) -> NormalizedEvent {
    NormalizedEvent {
        id: format!("{}-{}", raw.tx_hash.to_lowercase(), raw.log_index),
        chain: format!("ethereum:{}", raw.chain_id),
        event: raw.kind.event_name().to_string(),
        kind: raw.kind,
        address: raw.address.clone(),
        block_number: raw.block_number,
        block_hash: raw.block_hash.clone(),
        transaction_hash: raw.tx_hash.clone(),
        log_index: raw.log_index,
        args: raw.args.clone(),
    }
}

/// Normalize a batch, ordered by block number then log index.
pub fn normalize_all(raw: &[RawEvent]) -> Vec<NormalizedEvent> {
    let mut sorted: Vec<&RawEvent> = raw.iter().collect();
    sorted.sort_by_key(|e| e.position());
    sorted.into_iter().map(normalize).collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
