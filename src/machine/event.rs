//! # Events flowing through a service.
//!
//! An [`Event`] is a named value with an optional JSON payload and, for
//! events synthesized on behalf of a child, the originating child id.
//!
//! ## Well-known event names
//!
//! The interpreter synthesizes these itself:
//!
//! ```text
//! statevisor.init      first update after start
//! done.invoke.<id>     invoked child completed with a value
//! error.execution      invoked child failed (rejected, threw, panicked)
//! statevisor.update    subscribed child transitioned (payload: value + context)
//! ```
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use statevisor::Event;
//!
//! let ev = Event::new("RETRY").with_data(json!({ "attempt": 2 }));
//! assert_eq!(ev.name, "RETRY");
//! assert_eq!(ev.data["attempt"], 2);
//! ```

use serde_json::{json, Value};

use super::state::State;

/// Name of the event that produces the first update after `start`.
pub const INIT_EVENT: &str = "statevisor.init";

/// Name of the event propagating a subscribed child's transition.
pub const UPDATE_EVENT: &str = "statevisor.update";

/// Name of the event synthesized when an invoked child fails.
pub const ERROR_EXECUTION_EVENT: &str = "error.execution";

/// Prefix of the event synthesized when an invoked child completes.
pub const DONE_INVOKE_PREFIX: &str = "done.invoke.";

/// A named event with an optional payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Event name; the machine dispatches on this.
    pub name: String,
    /// Payload; `Value::Null` when the event carries none.
    pub data: Value,
    /// Id of the child this event was synthesized for, if any.
    pub origin: Option<String>,
}

impl Event {
    /// Creates an event with no payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Value::Null,
            origin: None,
        }
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Attaches the originating child id.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// The event delivered by the first update after `start`.
    pub fn init() -> Self {
        Self::new(INIT_EVENT)
    }

    /// `done.invoke.<id>` — an invoked child completed with `data`.
    pub fn done_invoke(child: &str, data: Value) -> Self {
        Self::new(format!("{DONE_INVOKE_PREFIX}{child}"))
            .with_data(data)
            .with_origin(child)
    }

    /// `error.execution` — an invoked child failed with `data`.
    pub fn error_execution(child: &str, data: Value) -> Self {
        Self::new(ERROR_EXECUTION_EVENT)
            .with_data(data)
            .with_origin(child)
    }

    /// `statevisor.update` — a subscribed child transitioned.
    ///
    /// A [`State`] holds closures and cannot ride an event payload; the
    /// observable content (configuration and context) is serialized
    /// instead.
    pub fn child_update(child: &str, state: &State) -> Self {
        Self::new(UPDATE_EVENT)
            .with_data(json!({
                "id": child,
                "value": state.value.as_json(),
                "context": state.context,
            }))
            .with_origin(child)
    }

    /// Whether this is an execution-error event.
    pub fn is_error(&self) -> bool {
        self.name == ERROR_EXECUTION_EVENT
    }

    /// Whether this is a child-completion event.
    pub fn is_done_invoke(&self) -> bool {
        self.name.starts_with(DONE_INVOKE_PREFIX)
    }
}

impl From<&str> for Event {
    fn from(name: &str) -> Self {
        Event::new(name)
    }
}

impl From<String> for Event {
    fn from(name: String) -> Self {
        Event::new(name)
    }
}

impl From<(&str, Value)> for Event {
    fn from((name, data): (&str, Value)) -> Self {
        Event::new(name).with_data(data)
    }
}
