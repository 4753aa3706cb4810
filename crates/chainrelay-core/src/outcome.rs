//! Execution outcome reported back to the hosting runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal state of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecState {
    /// Chain id has no registered Locker contract.
    UnknownChain,
    /// Chain id or chain height could not be read.
    ChainUnavailable,
    /// The stored checkpoint could not be read or parsed.
    CheckpointUnavailable,
    /// Checkpoint is already at or past head; no scan attempted.
    NoOp,
    /// A range query failed.
    ScanFailed,
    /// Scan finished without finding any event.
    EmptyResult,
    /// The downstream publish call failed.
    PublishFailed,
    /// Publish succeeded but the checkpoint write failed.
    CommitFailed,
    /// Events published and checkpoint advanced.
    Committed,
}

impl ExecState {
    /// Only `Committed` advances the checkpoint.
    pub fn advances_checkpoint(&self) -> bool {
        matches!(self, Self::Committed)
    }

    /// Returns `true` for states caused by a collaborator failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::UnknownChain
                | Self::ChainUnavailable
                | Self::CheckpointUnavailable
                | Self::ScanFailed
                | Self::PublishFailed
                | Self::CommitFailed
        )
    }
}

impl std::fmt::Display for ExecState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownChain => write!(f, "unknown-chain"),
            Self::ChainUnavailable => write!(f, "chain-unavailable"),
            Self::CheckpointUnavailable => write!(f, "checkpoint-unavailable"),
            Self::NoOp => write!(f, "no-op"),
            Self::ScanFailed => write!(f, "scan-failed"),
            Self::EmptyResult => write!(f, "empty-result"),
            Self::PublishFailed => write!(f, "publish-failed"),
            Self::CommitFailed => write!(f, "commit-failed"),
            Self::Committed => write!(f, "committed"),
        }
    }
}

/// The `{canExec, message?, callData?}` object handed to the runtime.
///
/// `canExec: false` means "nothing further to do this round", which is not
/// necessarily an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecOutcome {
    pub can_exec: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_data: Option<Vec<Value>>,
}

impl ExecOutcome {
    /// A successful execution with no follow-up call.
    pub fn executed() -> Self {
        Self {
            can_exec: true,
            message: None,
            call_data: Some(vec![]),
        }
    }

    /// Nothing further to do this round.
    pub fn skip(message: impl Into<String>) -> Self {
        Self {
            can_exec: false,
            message: Some(message.into()),
            call_data: None,
        }
    }
}

/// Everything one execution did, for logging and tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayReport {
    pub state: ExecState,
    pub outcome: ExecOutcome,
    /// Chain id the execution ran against, once resolved.
    pub chain_id: Option<u64>,
    /// Checkpoint loaded at the start, once loaded.
    pub checkpoint_before: Option<u64>,
    /// Checkpoint after the execution (equal to `checkpoint_before` unless
    /// the state is `Committed`).
    pub checkpoint_after: Option<u64>,
    /// Safe head the scan was bounded by, once computed.
    pub head: Option<u64>,
    /// Chain queries issued by the scanner.
    pub queries: usize,
    /// Events published downstream.
    pub published: usize,
}

impl RelayReport {
    pub(crate) fn new(state: ExecState, outcome: ExecOutcome) -> Self {
        Self {
            state,
            outcome,
            chain_id: None,
            checkpoint_before: None,
            checkpoint_after: None,
            head: None,
            queries: 0,
            published: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn executed_outcome_json() {
        let v = serde_json::to_value(ExecOutcome::executed()).unwrap();
        assert_eq!(v, json!({"canExec": true, "callData": []}));
    }

    #[test]
    fn skip_outcome_json() {
        let v = serde_json::to_value(ExecOutcome::skip("No new event found")).unwrap();
        assert_eq!(v, json!({"canExec": false, "message": "No new event found"}));
    }

    #[test]
    fn only_committed_advances() {
        assert!(ExecState::Committed.advances_checkpoint());
        assert!(!ExecState::EmptyResult.advances_checkpoint());
        assert!(!ExecState::PublishFailed.advances_checkpoint());
        assert!(ExecState::ScanFailed.is_failure());
        assert!(!ExecState::NoOp.is_failure());
    }
}
