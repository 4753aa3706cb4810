//! chainrelay-http: delivers relay batches to the downstream HTTP endpoint.

pub mod publisher;

pub use publisher::HttpPublisher;
