//! # Runtime core: the interpreter and its internal components.
//!
//! The public API re-exported from here is the [`Interpreter`] (plus its
//! construction and spawn helpers); everything else is an internal
//! building block the interpreter wires together.
//!
//! ## Files & responsibilities
//! - **interpreter.rs**: the service: owns the current state, listener
//!   sets, and notification bus; drives `start`/`send`/`update`/`stop`.
//! - **scheduler.rs**: run-to-completion serializer; one FIFO of work
//!   units per service, drained without ever holding a lock across a
//!   task.
//! - **executor.rs**: interprets the ordered action list of each entered
//!   state (sends, cancels, activity start/stop, logging, custom
//!   effects).
//! - **timers.rs**: delayed-event registry; send-id → cancellable clock
//!   timeout, kept 1:1 with live timers.
//! - **registry.rs**: child supervision: the four spawn paths, routing
//!   (`send_to`/`forward`), teardown.
//! - **spawn.rs**: thread-local spawn context enabling child creation
//!   from inside transition code.

mod executor;
mod interpreter;
mod registry;
mod scheduler;
mod spawn;
mod timers;

pub use interpreter::{interpret, Interpreter, ListenerId, SpawnOptions};
pub use spawn::{spawn, SpawnedChild};
