//! The MessageTransport trait definition.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::receipt::DeliveryReceipt;

/// A trait for handing an outbound message to a delivery channel.
///
/// Implementations range from the no-op [`crate::NullTransport`] (the message
/// is only recorded, never transmitted) to real SMS/WhatsApp gateways. The
/// trait is object-safe and can be used with `Box<dyn MessageTransport>`.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Hand one message to the channel.
    ///
    /// A successful return means the channel accepted the message; the
    /// receipt says whether end-to-end delivery was confirmed.
    async fn send(&self, recipient: &str, body: &str) -> Result<DeliveryReceipt, TransportError>;

    /// Get a human-readable name for this transport implementation.
    fn name(&self) -> &str;

    /// Check if the transport is ready to send.
    ///
    /// Default implementation always returns true.
    async fn is_ready(&self) -> bool {
        true
    }
}
