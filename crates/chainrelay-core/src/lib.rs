//! chainrelay-core: checkpointed, budgeted event relay.
//!
//! # Architecture
//!
//! ```text
//! RelayDriver (one execution)
//!     ├── ChainQuery        (chain id, height, Locker events per range)
//!     ├── RangeScanner      (MAX_RANGE per query, MAX_REQUESTS per execution)
//!     ├── normalize_all     (RawEvent → NormalizedEvent, chain order)
//!     ├── Publisher         (one batched downstream call)
//!     └── CheckpointStore   (commit only after publish succeeded)
//! ```

pub mod chain;
pub mod checkpoint;
pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod outcome;
pub mod publish;
pub mod range;
pub mod scanner;

pub use chain::{ChainQuery, ContractRegistry};
pub use checkpoint::{CheckpointStore, KeyValueStore, MemoryStore};
pub use config::{RelayConfig, RelayConfigBuilder};
pub use driver::RelayDriver;
pub use error::RelayError;
pub use event::{normalize, EventKind, NormalizedEvent, RawEvent};
pub use outcome::{ExecOutcome, ExecState, RelayReport};
pub use publish::Publisher;
pub use range::{BlockRange, Cursor};
pub use scanner::{RangeScanner, ScanError, ScanResult};
