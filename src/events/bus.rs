//! # Notification bus.
//!
//! [`Bus`] is a wrapper around [`tokio::sync::broadcast`] through which a
//! service delivers [`Notification`]s to any number of async observers.
//!
//! ## Key characteristics
//! - **Broadcast semantics**: every active subscriber receives a clone of
//!   each notification
//! - **Non-persistent**: notifications published with no subscribers are
//!   dropped silently (the service operates fine unobserved)
//! - **Bounded capacity**: lagging subscribers skip the oldest entries

use tokio::sync::broadcast;

use super::notification::Notification;

/// Broadcast channel for service lifecycle notifications.
#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<Notification>,
}

impl Bus {
    /// Creates a bus with the given ring-buffer capacity (min 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes a notification to all current subscribers.
    pub fn publish(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }

    /// Creates a subscriber receiving all future notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}
