//! # Developer-tools bridge.
//!
//! The interpreter never references a concrete inspection tool; it talks
//! to an optional [`DevTools`] capability with exactly two entry points.
//! Adapters receive the initial state once at start and every subsequent
//! (event, state) pair **before** application listeners are notified.

use crate::machine::{Event, State};

/// Narrow capability connecting a service to an external inspector.
pub trait DevTools: Send + Sync + 'static {
    /// Called once when the service starts, with the resolved initial state.
    fn init(&self, state: &State);

    /// Called on every update, before application listeners.
    fn send(&self, event: &Event, state: &State);
}
