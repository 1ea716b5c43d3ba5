//! Transport contract consumed by the engine.
//!
//! The engine only needs `publish`; connection management, subscription and
//! redelivery semantics belong to the transport implementation. Delivery is
//! at-least-once: the broker may redeliver our own answers, which is what
//! the echo filter exists for.

use async_trait::async_trait;

/// Publish-side contract for the engine's outbound results.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish a serialized result to `topic` with at-least-once semantics.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;
}

/// Transport error types.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("subscribe failed: {0}")]
    Subscribe(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("transport closed")]
    Closed,
}

/// One message delivered from the subscribed topic.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Topic the message arrived on.
    pub topic: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}
