//! In-memory transport for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::receipt::DeliveryReceipt;
use crate::trait_def::MessageTransport;

/// A sent message captured by [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub body: String,
}

/// A transport that records every send in memory and confirms delivery.
///
/// Recipients listed via [`MemoryTransport::fail_recipient`] get a
/// `DeliveryFailed` error instead, which lets tests exercise partial-failure
/// paths.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<SentMessage>>,
    failing: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future send to `recipient` fail.
    pub fn fail_recipient(&self, recipient: impl Into<String>) {
        self.failing.lock().unwrap().push(recipient.into());
    }

    /// Messages captured so far, in send order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of messages captured so far.
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageTransport for MemoryTransport {
    async fn send(&self, recipient: &str, body: &str) -> Result<DeliveryReceipt, TransportError> {
        if self.failing.lock().unwrap().iter().any(|r| r == recipient) {
            return Err(TransportError::DeliveryFailed(format!(
                "configured to fail for {recipient}"
            )));
        }

        self.sent.lock().unwrap().push(SentMessage {
            recipient: recipient.to_string(),
            body: body.to_string(),
        });

        Ok(DeliveryReceipt::delivered(recipient))
    }

    fn name(&self) -> &str {
        "MemoryTransport"
    }
}
