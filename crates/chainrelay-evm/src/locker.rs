//! Locker contract events and their decoding.
//!
//! Indexed parameters are read from `topics[1..]`, the rest from the ABI
//! encoded `data` payload. Values are rendered JSON-friendly: checksummed
//! addresses, decimal integers, `0x` hex bytes.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{keccak256, B256};
use serde_json::{Map, Value};
use thiserror::Error;

use chainrelay_core::event::{EventKind, RawEvent};

use crate::log::RawLog;

/// Errors raised while decoding a Locker log.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("missing topic for indexed parameter '{param}'")]
    MissingTopic { param: &'static str },

    #[error("invalid hex in {what}: {reason}")]
    InvalidHex { what: &'static str, reason: String },

    #[error("ABI decode failed: {0}")]
    Abi(String),

    #[error("invalid log field: {0}")]
    Field(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamType {
    Address,
    Uint256,
    Bytes,
}

impl ParamType {
    fn dyn_type(self) -> DynSolType {
        match self {
            Self::Address => DynSolType::Address,
            Self::Uint256 => DynSolType::Uint(256),
            Self::Bytes => DynSolType::Bytes,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Param {
    name: &'static str,
    ty: ParamType,
    indexed: bool,
}

const fn param(name: &'static str, ty: ParamType, indexed: bool) -> Param {
    Param { name, ty, indexed }
}

/// One Locker event definition.
#[derive(Debug, Clone, Copy)]
pub struct EventDef {
    pub kind: EventKind,
    /// Canonical signature, e.g. `FundsDeposited(address,address,uint256)`.
    pub signature: &'static str,
    params: &'static [Param],
}

const DEPOSIT_PARAMS: &[Param] = &[
    param("token", ParamType::Address, true),
    param("user", ParamType::Address, true),
    param("amount", ParamType::Uint256, false),
];

const WITHDRAW_PARAMS: &[Param] = &[
    param("token", ParamType::Address, true),
    param("user", ParamType::Address, true),
    param("amount", ParamType::Uint256, false),
    param("signature", ParamType::Bytes, false),
];

/// The events the relay listens for.
pub static LOCKER_EVENTS: [EventDef; 3] = [
    EventDef {
        kind: EventKind::Deposit,
        signature: "FundsDeposited(address,address,uint256)",
        params: DEPOSIT_PARAMS,
    },
    EventDef {
        kind: EventKind::Withdrawal,
        signature: "FundsWithdrawn(address,address,uint256,bytes)",
        params: WITHDRAW_PARAMS,
    },
    EventDef {
        kind: EventKind::WithdrawalCancellation,
        signature: "WithdrawCanceled(address,address,uint256,bytes)",
        params: WITHDRAW_PARAMS,
    },
];

impl EventDef {
    /// Look up the definition for an event kind.
    pub fn for_kind(kind: EventKind) -> &'static EventDef {
        let index = match kind {
            EventKind::Deposit => 0,
            EventKind::Withdrawal => 1,
            EventKind::WithdrawalCancellation => 2,
        };
        &LOCKER_EVENTS[index]
    }

    /// keccak256 of the canonical signature.
    pub fn topic0(&self) -> B256 {
        keccak256(self.signature.as_bytes())
    }

    /// `topic0` as a lowercase `0x…` string, as used in `eth_getLogs` filters.
    pub fn topic0_hex(&self) -> String {
        format!("0x{}", hex::encode(self.topic0()))
    }
}

/// Find the definition matching a log's `topic0`.
pub fn match_topic0(topic0: &str) -> Option<&'static EventDef> {
    LOCKER_EVENTS
        .iter()
        .find(|def| def.topic0_hex().eq_ignore_ascii_case(topic0))
}

/// Decode a log into a `RawEvent`.
///
/// Returns `Ok(None)` for logs that are not Locker events.
pub fn decode_log(log: &RawLog, chain_id: u64) -> Result<Option<RawEvent>, DecodeError> {
    let Some(def) = log.topic0().and_then(match_topic0) else {
        return Ok(None);
    };

    let mut args = Map::new();

    let mut topics = log.topics.iter().skip(1);
    for p in def.params.iter().filter(|p| p.indexed) {
        let topic = topics.next().ok_or(DecodeError::MissingTopic { param: p.name })?;
        let word = decode_hex(topic, "topic")?;
        let value = p
            .ty
            .dyn_type()
            .abi_decode(&word)
            .map_err(|e| DecodeError::Abi(format!("topic '{}': {e}", p.name)))?;
        args.insert(p.name.to_string(), to_json(value));
    }

    let data_params: Vec<&Param> = def.params.iter().filter(|p| !p.indexed).collect();
    if !data_params.is_empty() {
        let data = decode_hex(&log.data, "data")?;
        let tuple = DynSolType::Tuple(data_params.iter().map(|p| p.ty.dyn_type()).collect());
        let values = match tuple
            .abi_decode_params(&data)
            .map_err(|e| DecodeError::Abi(format!("data: {e}")))?
        {
            DynSolValue::Tuple(values) => values,
            other => vec![other],
        };
        for (p, value) in data_params.iter().zip(values) {
            args.insert(p.name.to_string(), to_json(value));
        }
    }

    Ok(Some(RawEvent {
        kind: def.kind,
        chain_id,
        address: log.address.clone(),
        block_number: log
            .block_number_u64()
            .map_err(|e| DecodeError::Field(e.to_string()))?,
        block_hash: log.block_hash.clone(),
        tx_hash: log.tx_hash.clone(),
        log_index: log
            .log_index_u32()
            .map_err(|e| DecodeError::Field(e.to_string()))?,
        args,
    }))
}

fn decode_hex(s: &str, what: &'static str) -> Result<Vec<u8>, DecodeError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|e| DecodeError::InvalidHex {
        what,
        reason: e.to_string(),
    })
}

fn to_json(value: DynSolValue) -> Value {
    match value {
        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Bool(b) => Value::Bool(b),
        DynSolValue::Bytes(b) => Value::String(format!("0x{}", hex::encode(b))),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(format!("0x{}", hex::encode(&word[..size])))
        }
        DynSolValue::String(s) => Value::String(s),
        DynSolValue::Array(vals) | DynSolValue::FixedArray(vals) | DynSolValue::Tuple(vals) => {
            Value::Array(vals.into_iter().map(to_json).collect())
        }
        DynSolValue::Function(f) => Value::String(format!("0x{}", hex::encode(f))),
        #[allow(unreachable_patterns)]
        other => Value::String(format!("{other:?}")),
    }
}
