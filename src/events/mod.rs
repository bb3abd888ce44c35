//! # Lifecycle notifications published by a service.
//!
//! Async observers that cannot hook the synchronous listener sets can
//! subscribe to a service's [`Bus`] and receive [`Notification`] values
//! describing its lifecycle: transitions, delayed sends armed and
//! cancelled, children spawned and stopped, completion, shutdown.
//!
//! The bus is a bounded, lossy broadcast: slow subscribers skip old
//! notifications. The ordering guarantees of the interpreter apply to
//! its listener sets, not the bus.

mod bus;
mod notification;

pub use bus::Bus;
pub use notification::{Notification, NotificationKind};
