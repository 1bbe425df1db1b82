//! Outbound message delivery seam for Tuma.
//!
//! "Sending" a broadcast historically meant writing a history row and nothing
//! else. This crate makes the delivery channel an explicit collaborator: the
//! workflow layer talks to a [`MessageTransport`] and records whatever the
//! receipt says, so "recorded as sent" and "actually delivered" stay
//! distinguishable.

pub mod error;
pub mod memory;
pub mod null;
pub mod receipt;
pub mod trait_def;

pub use error::TransportError;
pub use memory::{MemoryTransport, SentMessage};
pub use null::NullTransport;
pub use receipt::{Delivery, DeliveryReceipt};
pub use trait_def::MessageTransport;
