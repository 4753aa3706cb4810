//! chainrelay-evm: EVM chain client and Locker event decoding.

pub mod client;
pub mod locker;
pub mod log;
pub mod rpc;

pub use client::HttpChainClient;
pub use locker::{decode_log, EventDef, LOCKER_EVENTS};
pub use log::RawLog;
