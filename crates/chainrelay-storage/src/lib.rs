//! chainrelay-storage: key/value backends for the relay checkpoint.
//!
//! Backends:
//! - [`MemoryStore`]: in-memory (dev/testing, no persistence), from `chainrelay-core`
//! - [`file`]: JSON object file, rewritten atomically on every write
//! - `sqlite`: SQLite via `sqlx` (behind the `sqlite` feature)

pub mod file;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use chainrelay_core::checkpoint::MemoryStore;
pub use file::JsonFileStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
