//! Transport error types.

use thiserror::Error;

/// Errors that can occur while handing a message to a delivery channel.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The recipient address is unusable.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The channel refused or dropped the message.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    /// The transport is not ready to send.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}
