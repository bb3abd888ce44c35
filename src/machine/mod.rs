//! # The machine contract consumed by the interpreter.
//!
//! A [`Machine`] is a compiled, pure statechart: given a state and an
//! event it returns the next state, with the side effects to perform
//! attached as data ([`Action`](crate::Action) lists, activity flags).
//! The interpreter never looks inside the transition logic; it only
//! drives it and executes what comes back.
//!
//! [`MachineOptions`] carries the three lookup tables resolved at
//! execution time:
//!
//! | Table        | Keyed by        | Produces                               |
//! |--------------|-----------------|----------------------------------------|
//! | `delays`     | delay name      | a fixed or context-derived delay       |
//! | `services`   | invoke source   | an [`InvokeSource`] child to supervise |
//! | `activities` | activity type   | an optional dispose handle             |

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::actions::ActivityDef;
use crate::actors::{DisposeHandle, InvokeSource};

mod event;
mod state;

pub use event::{
    Event, DONE_INVOKE_PREFIX, ERROR_EXECUTION_EVENT, INIT_EVENT, UPDATE_EVENT,
};
pub use state::{DoneDataFn, State, StateValue};

/// A delay as configured in the machine's `delays` table.
#[derive(Clone)]
pub enum Delay {
    /// Fixed delay in milliseconds.
    Fixed(u64),
    /// Delay computed from the current context and event, in milliseconds.
    Dynamic(Arc<dyn Fn(&Value, &Event) -> u64 + Send + Sync>),
}

impl std::fmt::Debug for Delay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delay::Fixed(ms) => f.debug_tuple("Fixed").field(ms).finish(),
            Delay::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Produces the source of an invoked child from the invoking state's
/// context and event.
///
/// Every table entry is a factory; a constant source is a factory that
/// ignores its arguments.
pub type ServiceFactory = Arc<dyn Fn(&Value, &Event) -> InvokeSource + Send + Sync>;

/// Starts a non-invoke activity, optionally returning its dispose handle.
pub type ActivityFn = Arc<dyn Fn(&Value, &ActivityDef) -> Option<DisposeHandle> + Send + Sync>;

/// Execution-time lookup tables attached to a machine.
#[derive(Clone, Default)]
pub struct MachineOptions {
    /// Named delays referenced by delayed send actions.
    pub delays: HashMap<String, Delay>,
    /// Service factories referenced by invoke activities (`src`).
    pub services: HashMap<String, ServiceFactory>,
    /// Activity implementations referenced by activity type.
    pub activities: HashMap<String, ActivityFn>,
}

impl MachineOptions {
    /// Registers a named delay.
    #[must_use]
    pub fn with_delay(mut self, name: impl Into<String>, delay: Delay) -> Self {
        self.delays.insert(name.into(), delay);
        self
    }

    /// Registers a service factory.
    #[must_use]
    pub fn with_service(mut self, name: impl Into<String>, factory: ServiceFactory) -> Self {
        self.services.insert(name.into(), factory);
        self
    }

    /// Registers an activity implementation.
    #[must_use]
    pub fn with_activity(mut self, name: impl Into<String>, activity: ActivityFn) -> Self {
        self.activities.insert(name.into(), activity);
        self
    }
}

/// A compiled, pure statechart.
///
/// Implementations must be pure: `transition` and `resolve_state` may
/// not perform side effects (the one sanctioned exception being
/// [`spawn`](crate::spawn), which records a child on the service
/// currently computing a transition).
pub trait Machine: Send + Sync + 'static {
    /// Stable machine identifier; doubles as the default service id.
    fn id(&self) -> &str;

    /// The machine's own initial state.
    fn initial_state(&self) -> State;

    /// Resolves a caller-supplied (possibly partial) state into a full
    /// state of this machine.
    fn resolve_state(&self, state: State) -> State {
        state
    }

    /// Computes the next state for `event` from `state`.
    fn transition(&self, state: &State, event: &Event) -> State;

    /// Execution-time lookup tables.
    fn options(&self) -> &MachineOptions;

    /// Whether invocation errors the machine does not handle should stop
    /// the service.
    fn strict(&self) -> bool {
        false
    }
}
