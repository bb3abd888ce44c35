//! # statevisor
//!
//! **Statevisor** is a statechart interpreter runtime.
//!
//! It binds a compiled, pure state machine definition to a live event
//! stream: executing side effects, scheduling delayed events, spawning
//! and supervising child machines and tasks, and publishing state
//! updates to observers — while preserving run-to-completion semantics
//! even under reentrant sends.
//!
//! ## Features
//!
//! | Area            | Description                                                      | Key types / traits                           |
//! |-----------------|------------------------------------------------------------------|----------------------------------------------|
//! | **Interpreter** | Bind a machine, start it, send events, observe transitions.      | [`Interpreter`], [`interpret`]               |
//! | **Machines**    | The pure statechart contract the interpreter consumes.           | [`Machine`], [`State`], [`Event`]            |
//! | **Actions**     | Side effects carried by states as data.                          | [`Action`], [`SendAction`], [`ActivityDef`]  |
//! | **Actors**      | Uniform supervision of machine/future/callback/activity children. | [`ActorRef`], [`InvokeSource`], [`spawn`]   |
//! | **Clocks**      | Deterministic time for delayed sends.                            | [`Clock`], [`SystemClock`], [`SimulatedClock`] |
//! | **Observers**   | Sync listener sets plus an async notification bus.               | [`Notification`], [`Bus`]                    |
//! | **Errors**      | Typed errors for runtime misuse and unhandled invocations.       | [`InterpreterError`], [`ClockError`]         |
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use statevisor::{interpret, Event, Machine, MachineOptions, State};
//!
//! struct Toggle {
//!     options: MachineOptions,
//! }
//!
//! impl Machine for Toggle {
//!     fn id(&self) -> &str {
//!         "toggle"
//!     }
//!
//!     fn initial_state(&self) -> State {
//!         State::new("off").with_next_events(["TOGGLE"])
//!     }
//!
//!     fn transition(&self, state: &State, event: &Event) -> State {
//!         let target = match (&state.value, event.name.as_str()) {
//!             (value, "TOGGLE") if *value == "off".into() => "on",
//!             (_, "TOGGLE") => "off",
//!             _ => return state.clone().with_event(event.clone()),
//!         };
//!         State::new(target)
//!             .with_event(event.clone())
//!             .with_history(state.clone())
//!             .with_next_events(["TOGGLE"])
//!     }
//!
//!     fn options(&self) -> &MachineOptions {
//!         &self.options
//!     }
//! }
//!
//! # fn main() -> Result<(), statevisor::InterpreterError> {
//! let service = interpret(Arc::new(Toggle {
//!     options: MachineOptions::default(),
//! }));
//! service.on_transition(|state, event| {
//!     println!("{} (via {})", state.value, event.name);
//! });
//! service.start(None)?;
//! service.send("TOGGLE")?;
//! # Ok(())
//! # }
//! ```
//!
//! ---

mod actions;
mod actors;
mod clock;
mod config;
mod core;
mod devtools;
mod diag;
mod error;
mod events;
mod logger;
mod machine;

// ---- Public re-exports ----

pub use actions::{
    Action, ActionExec, ActionMeta, ActivityDef, ContextMapper, CustomAction, DelaySpec, LogExpr,
    SendAction, SendTarget, INVOKE_ACTIVITY_TYPE,
};
pub use actors::{
    ActorRef, BoxInvokeFuture, CallbackCleanup, CallbackFn, ChildListener, DisposeHandle,
    EventSender, InvokeSource,
};
pub use clock::{Clock, SimulatedClock, SystemClock, TimerCallback, TimerHandle};
pub use config::InterpreterOptions;
pub use core::{interpret, spawn, Interpreter, ListenerId, SpawnOptions, SpawnedChild};
pub use devtools::DevTools;
pub use error::{ClockError, InterpreterError};
pub use events::{Bus, Notification, NotificationKind};
pub use logger::{ConsoleLogger, Logger};
pub use machine::{
    Delay, DoneDataFn, Event, Machine, MachineOptions, ServiceFactory, State, StateValue,
    ActivityFn, DONE_INVOKE_PREFIX, ERROR_EXECUTION_EVENT, INIT_EVENT, UPDATE_EVENT,
};
