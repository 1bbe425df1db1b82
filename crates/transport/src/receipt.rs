//! Delivery receipts returned by transports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How far a message got through the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// Accepted by the channel; end-to-end delivery unconfirmed.
    Sent,
    /// Confirmed delivered to the recipient.
    Delivered,
}

/// Receipt for one accepted send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Recipient address the channel accepted.
    pub recipient: String,
    /// How far the message got.
    pub delivery: Delivery,
    /// When the channel accepted (or confirmed) the message.
    pub timestamp: DateTime<Utc>,
}

impl DeliveryReceipt {
    /// A `Sent` receipt stamped now.
    pub fn sent(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            delivery: Delivery::Sent,
            timestamp: Utc::now(),
        }
    }

    /// A `Delivered` receipt stamped now.
    pub fn delivered(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            delivery: Delivery::Delivered,
            timestamp: Utc::now(),
        }
    }
}
