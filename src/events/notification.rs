//! # Notification values carried by the bus.
//!
//! Each notification has a globally unique, monotonically increasing
//! sequence number so observers can re-order events delivered through
//! independent async channels.
//!
//! ## Notification flow examples
//!
//! ### Plain transition
//! ```text
//! send("GO")
//!   → EventReceived{event: "GO"}
//!   → Transitioned{state: "b", event: "GO"}
//! ```
//!
//! ### Invocation
//! ```text
//! Transitioned{state: "loading"}
//!   → ChildSpawned{child: "fetch-1"}
//!   → ... child settles ...
//!   → EventReceived{event: "done.invoke.fetch-1"}
//!   → Transitioned{state: "ready"}
//!   → ChildStopped{child: "fetch-1"}
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use crate::machine::StateValue;

/// Global sequence counter for notification ordering.
static NOTIFICATION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of service lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// The service started and resolved its initial state.
    Started,
    /// An event was accepted for processing.
    EventReceived,
    /// The service transitioned and notified its listeners.
    Transitioned,
    /// A delayed send was armed on the clock.
    DelayedSendArmed,
    /// A delayed send was cancelled before firing.
    DelayedSendCancelled,
    /// A child actor was registered.
    ChildSpawned,
    /// A child actor was stopped and removed.
    ChildStopped,
    /// The service reached a final state.
    Done,
    /// The service stopped.
    Stopped,
}

/// One lifecycle notification with optional metadata.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp (for logging; may go backwards under NTP).
    pub at: SystemTime,
    /// The kind of notification.
    pub kind: NotificationKind,
    /// Identifier of the publishing service.
    pub service: Option<String>,
    /// Rendered state configuration, if relevant.
    pub state: Option<String>,
    /// Event name, if relevant.
    pub event: Option<String>,
    /// Child id, if relevant.
    pub child: Option<String>,
    /// Send-id of a delayed send, if relevant.
    pub send_id: Option<String>,
    /// Delay of an armed send, if relevant.
    pub delay: Option<Duration>,
}

impl Notification {
    /// Creates a notification of the given kind with the next sequence
    /// number and the current timestamp.
    pub fn now(kind: NotificationKind) -> Self {
        Self {
            seq: NOTIFICATION_SEQ.fetch_add(1, Ordering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            state: None,
            event: None,
            child: None,
            send_id: None,
            delay: None,
        }
    }

    /// Attaches the publishing service id.
    #[must_use]
    pub fn with_service(mut self, id: impl Into<String>) -> Self {
        self.service = Some(id.into());
        self
    }

    /// Attaches the rendered state configuration.
    #[must_use]
    pub fn with_state(mut self, value: &StateValue) -> Self {
        self.state = Some(value.to_string());
        self
    }

    /// Attaches an event name.
    #[must_use]
    pub fn with_event(mut self, name: impl Into<String>) -> Self {
        self.event = Some(name.into());
        self
    }

    /// Attaches a child id.
    #[must_use]
    pub fn with_child(mut self, id: impl Into<String>) -> Self {
        self.child = Some(id.into());
        self
    }

    /// Attaches a send-id.
    #[must_use]
    pub fn with_send_id(mut self, id: impl Into<String>) -> Self {
        self.send_id = Some(id.into());
        self
    }

    /// Attaches a delay.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}
