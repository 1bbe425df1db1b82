//! Table change notifications.
//!
//! The service-request queue is the one view that refreshes live across
//! sessions. Repositories publish a [`TableChange`] on every mutation when
//! handed a feed; subscribers refetch on any event.

use tokio::sync::broadcast;

/// Kind of mutation that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// A single table mutation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableChange {
    pub table: &'static str,
    pub op: ChangeOp,
    pub row_id: String,
}

/// Broadcast fan-out of table mutations to any number of subscribers.
///
/// Dropping every receiver is fine; publishing to an empty feed is a no-op.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<TableChange>,
}

impl ChangeFeed {
    /// Create a feed buffering up to `capacity` undelivered events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to future changes.
    pub fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        self.tx.subscribe()
    }

    /// Publish a change to all current subscribers.
    pub fn publish(&self, change: TableChange) {
        // Err means no subscribers are listening right now.
        if self.tx.send(change).is_err() {
            tracing::debug!("change feed has no subscribers");
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(64)
    }
}
