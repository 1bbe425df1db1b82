//! Null transport - accepts every message without transmitting anything.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::receipt::DeliveryReceipt;
use crate::trait_def::MessageTransport;

/// A transport that accepts every send and transmits nothing.
///
/// This preserves the history-only semantics of "sending": the message is
/// recorded as sent, and no delivery confirmation ever arrives.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTransport;

impl NullTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageTransport for NullTransport {
    async fn send(&self, recipient: &str, _body: &str) -> Result<DeliveryReceipt, TransportError> {
        tracing::debug!(recipient = %recipient, "null transport accepted message");
        Ok(DeliveryReceipt::sent(recipient))
    }

    fn name(&self) -> &str {
        "NullTransport"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::Delivery;

    #[tokio::test]
    async fn test_null_accepts_everything() {
        let transport = NullTransport::new();

        let receipt = transport.send("+250788000000", "Hello!").await.unwrap();
        assert_eq!(receipt.recipient, "+250788000000");
        assert_eq!(receipt.delivery, Delivery::Sent);
    }

    #[tokio::test]
    async fn test_null_is_ready() {
        let transport = NullTransport::new();
        assert!(transport.is_ready().await);
        assert_eq!(transport.name(), "NullTransport");
    }
}
