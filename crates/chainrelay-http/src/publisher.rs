//! HTTP publisher backed by `reqwest`.
//!
//! One POST per execution carrying the whole batch as a JSON array. Success
//! is judged at the transport level only: the call completed, the status was
//! 2xx, and the body (if any) was JSON. The body itself is not inspected.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use chainrelay_core::error::RelayError;
use chainrelay_core::event::NormalizedEvent;
use chainrelay_core::publish::Publisher;
use chainrelay_core::RelayConfig;

/// Publishes normalized batches to a downstream HTTP endpoint.
pub struct HttpPublisher {
    endpoint: String,
    stream_id: Option<String>,
    http: reqwest::Client,
}

impl HttpPublisher {
    /// Create a publisher for `endpoint` with the given request timeout.
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into(),
            stream_id: None,
            http,
        })
    }

    /// Build a publisher from the relay configuration.
    pub fn from_config(config: &RelayConfig) -> Result<Self, RelayError> {
        let publisher = Self::new(
            config.publish_endpoint.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )?;
        Ok(publisher.with_stream_id(config.stream_id.clone()))
    }

    /// Tag every batch with a logical stream id. Empty ids are ignored.
    pub fn with_stream_id(mut self, stream_id: impl Into<String>) -> Self {
        let id = stream_id.into();
        self.stream_id = (!id.is_empty()).then_some(id);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref()
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(&self, events: &[NormalizedEvent]) -> Result<Value, RelayError> {
        let mut req = self.http.post(&self.endpoint).json(events);
        if let Some(stream) = &self.stream_id {
            req = req.query(&[("streamId", stream)]);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| RelayError::Publish(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RelayError::Publish(e.to_string()))?;

        if !status.is_success() {
            return Err(RelayError::Publish(format!(
                "HTTP {}: {body}",
                status.as_u16()
            )));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| RelayError::Publish(format!("non-JSON response: {e}")))?;

        tracing::debug!(
            endpoint = %self.endpoint,
            events = events.len(),
            response = %value,
            "publish response"
        );
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainrelay_core::RelayConfigBuilder;

    #[test]
    fn from_config_carries_stream_and_endpoint() {
        let cfg = RelayConfigBuilder::new()
            .publish_endpoint("https://ingest.example/publish")
            .stream_id("0xabc/locker")
            .build()
            .unwrap();
        let publisher = HttpPublisher::from_config(&cfg).unwrap();
        assert_eq!(publisher.endpoint(), "https://ingest.example/publish");
        assert_eq!(publisher.stream_id(), Some("0xabc/locker"));
    }

    #[test]
    fn empty_stream_id_is_dropped() {
        let publisher = HttpPublisher::new("http://localhost:3000/publish", Duration::from_secs(1))
            .unwrap()
            .with_stream_id("");
        assert!(publisher.stream_id().is_none());
    }

    #[tokio::test]
    async fn closed_port_is_a_publish_error() {
        // bind then drop to get a port nothing listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let publisher = HttpPublisher::new(
            format!("http://127.0.0.1:{port}/publish"),
            Duration::from_secs(2),
        )
        .unwrap();

        let err = publisher.publish(&[]).await.unwrap_err();
        assert!(err.is_publish());
    }
}
