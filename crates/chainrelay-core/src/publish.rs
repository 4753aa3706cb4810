//! Downstream publish collaborator.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RelayError;
use crate::event::NormalizedEvent;

/// Trait for delivering a batch of normalized events downstream.
///
/// A returned `Ok` means the call completed at the transport level; the
/// response body is handed back for logging only.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, events: &[NormalizedEvent]) -> Result<Value, RelayError>;
}

#[async_trait]
impl<T: Publisher + ?Sized> Publisher for std::sync::Arc<T> {
    async fn publish(&self, events: &[NormalizedEvent]) -> Result<Value, RelayError> {
        (**self).publish(events).await
    }
}
