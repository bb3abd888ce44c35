//! # The action sum type interpreted by the executor.
//!
//! Built-in tags form a closed sum; [`CustomAction`] is the open escape
//! hatch for user-defined effects carrying their own executor closure.
//!
//! ## Execution rules
//! - Actions execute in list order, bound to the (context, event) pair of
//!   the state that carries them.
//! - A `Custom` action without an executor is a debug-warned no-op.
//! - `Start`/`StopActivity` reference an [`ActivityDef`]; when its type is
//!   [`INVOKE_ACTIVITY_TYPE`] the definition describes a supervised child
//!   (`src`, optional `data` rebinding, auto-forward flag) rather than a
//!   plain activity.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::machine::{Event, State};

/// Activity type marking an invocation (supervised child with done/error
/// events) as opposed to a plain activity.
pub const INVOKE_ACTIVITY_TYPE: &str = "statevisor.invoke";

/// Executor closure attached to a [`CustomAction`].
pub type ActionExec = Arc<dyn Fn(&Value, &Event, ActionMeta<'_>) + Send + Sync>;

/// Maps the invoking state's (context, event) to a child machine context.
pub type ContextMapper = Arc<dyn Fn(&Value, &Event) -> Value + Send + Sync>;

/// Produces the value handed to the logger by a `Log` action.
pub type LogExpr = Arc<dyn Fn(&Value, &Event) -> Value + Send + Sync>;

/// Extra context handed to a custom action executor.
pub struct ActionMeta<'a> {
    /// The action being executed.
    pub action: &'a Action,
    /// The state the action list belongs to.
    pub state: &'a State,
}

/// One side effect attached to a state.
#[derive(Clone)]
pub enum Action {
    /// Marker produced by the machine for the initial update; no effect.
    Init,
    /// Send an event: to self, to a child, to the parent, now or delayed.
    Send(SendAction),
    /// Cancel a pending delayed send by its send-id.
    Cancel {
        /// The send-id of the delayed send to cancel.
        send_id: String,
    },
    /// Start an activity or invocation.
    Start {
        /// What to start.
        activity: ActivityDef,
    },
    /// Stop the child started for this activity.
    StopActivity {
        /// What to stop.
        activity: ActivityDef,
    },
    /// Hand a value to the configured logger.
    Log {
        /// Optional label passed through to the logger.
        label: Option<String>,
        /// Value producer; when absent the (context, event) pair is logged.
        expr: Option<LogExpr>,
    },
    /// User-defined action.
    Custom(CustomAction),
}

impl Action {
    /// Convenience constructor for a send action.
    pub fn send(send: SendAction) -> Self {
        Action::Send(send)
    }

    /// Convenience constructor for a cancel action.
    pub fn cancel(send_id: impl Into<String>) -> Self {
        Action::Cancel {
            send_id: send_id.into(),
        }
    }

    /// Convenience constructor for a start action.
    pub fn start(activity: ActivityDef) -> Self {
        Action::Start { activity }
    }

    /// Convenience constructor for a stop action.
    pub fn stop(activity: ActivityDef) -> Self {
        Action::StopActivity { activity }
    }

    /// A log action without expression or label.
    pub fn log() -> Self {
        Action::Log {
            label: None,
            expr: None,
        }
    }

    /// A labeled log action with a value producer.
    pub fn log_expr(label: Option<&str>, expr: LogExpr) -> Self {
        Action::Log {
            label: label.map(str::to_string),
            expr: Some(expr),
        }
    }

    /// A custom action with an executor.
    pub fn custom<F>(name: impl Into<String>, exec: F) -> Self
    where
        F: for<'a, 'b, 'c> Fn(&'a Value, &'b Event, ActionMeta<'c>) + Send + Sync + 'static,
    {
        Action::Custom(CustomAction {
            name: name.into(),
            exec: Some(Arc::new(exec)),
        })
    }

    /// A custom action without an executor (warned no-op; useful for
    /// machines compiled ahead of their host wiring).
    pub fn custom_unbound(name: impl Into<String>) -> Self {
        Action::Custom(CustomAction {
            name: name.into(),
            exec: None,
        })
    }

    /// Short stable tag for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Init => "init",
            Action::Send(_) => "send",
            Action::Cancel { .. } => "cancel",
            Action::Start { .. } => "start",
            Action::StopActivity { .. } => "stop",
            Action::Log { .. } => "log",
            Action::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Send(send) => f.debug_tuple("Send").field(send).finish(),
            Action::Cancel { send_id } => f.debug_struct("Cancel").field("send_id", send_id).finish(),
            Action::Start { activity } => f.debug_struct("Start").field("activity", activity).finish(),
            Action::StopActivity { activity } => f
                .debug_struct("StopActivity")
                .field("activity", activity)
                .finish(),
            Action::Log { label, .. } => f.debug_struct("Log").field("label", label).finish_non_exhaustive(),
            Action::Custom(custom) => f.debug_struct("Custom").field("name", &custom.name).finish_non_exhaustive(),
            Action::Init => f.write_str("Init"),
        }
    }
}

/// User-defined action: a name plus an optional executor closure.
#[derive(Clone)]
pub struct CustomAction {
    /// Action name, used in diagnostics when no executor is attached.
    pub name: String,
    /// Executor invoked with (context, event, meta); absent means no-op.
    pub exec: Option<ActionExec>,
}

/// Routing target of a send action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendTarget {
    /// Route to the parent service.
    Parent,
    /// Route to the child registered under this id.
    Child(String),
}

/// Delay of a send action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DelaySpec {
    /// Fixed delay in milliseconds.
    Millis(u64),
    /// Reference into the machine's `delays` table.
    Named(String),
}

/// A `send` action: event, routing, optional delay, and the send-id a
/// later `cancel` may address.
#[derive(Clone, Debug)]
pub struct SendAction {
    /// The event to deliver.
    pub event: Event,
    /// Routing; `None` sends to self.
    pub to: Option<SendTarget>,
    /// Optional delay; `None` delivers immediately.
    pub delay: Option<DelaySpec>,
    /// Cancellation key. Defaults to the event name.
    pub id: String,
}

impl SendAction {
    /// Creates an immediate self-send; the send-id defaults to the event
    /// name.
    pub fn new(event: impl Into<Event>) -> Self {
        let event = event.into();
        let id = event.name.clone();
        Self {
            event,
            to: None,
            delay: None,
            id,
        }
    }

    /// Routes to a named child.
    #[must_use]
    pub fn to_child(mut self, id: impl Into<String>) -> Self {
        self.to = Some(SendTarget::Child(id.into()));
        self
    }

    /// Routes to the parent service.
    #[must_use]
    pub fn to_parent(mut self) -> Self {
        self.to = Some(SendTarget::Parent);
        self
    }

    /// Delays delivery by a fixed number of milliseconds.
    #[must_use]
    pub fn after_millis(mut self, ms: u64) -> Self {
        self.delay = Some(DelaySpec::Millis(ms));
        self
    }

    /// Delays delivery by a named delay from the machine's table.
    #[must_use]
    pub fn after_named(mut self, name: impl Into<String>) -> Self {
        self.delay = Some(DelaySpec::Named(name.into()));
        self
    }

    /// Overrides the send-id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Definition of an activity or invocation bound to a state.
#[derive(Clone)]
pub struct ActivityDef {
    /// Child id this activity registers under.
    pub id: String,
    /// Activity type; [`INVOKE_ACTIVITY_TYPE`] marks an invocation,
    /// anything else resolves through the machine's `activities` table.
    pub activity_type: String,
    /// Invoke only: name of the service factory to resolve.
    pub src: Option<String>,
    /// Invoke only: context rebinding for a child machine.
    pub data: Option<ContextMapper>,
    /// Invoke only: auto-forward events accepted by the parent.
    pub forward: bool,
}

impl ActivityDef {
    /// Defines an invocation of the service registered under `src`.
    pub fn invoke(id: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            activity_type: INVOKE_ACTIVITY_TYPE.to_string(),
            src: Some(src.into()),
            data: None,
            forward: false,
        }
    }

    /// Defines a plain activity of the given type.
    pub fn activity(id: impl Into<String>, activity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            activity_type: activity_type.into(),
            src: None,
            data: None,
            forward: false,
        }
    }

    /// Attaches a context mapper for an invoked child machine.
    #[must_use]
    pub fn with_data(mut self, data: ContextMapper) -> Self {
        self.data = Some(data);
        self
    }

    /// Enables auto-forwarding of parent events to this child.
    #[must_use]
    pub fn with_forward(mut self, forward: bool) -> Self {
        self.forward = forward;
        self
    }

    /// Whether this definition describes an invocation.
    pub fn is_invoke(&self) -> bool {
        self.activity_type == INVOKE_ACTIVITY_TYPE
    }
}

impl fmt::Debug for ActivityDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityDef")
            .field("id", &self.id)
            .field("activity_type", &self.activity_type)
            .field("src", &self.src)
            .field("forward", &self.forward)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_id_defaults_to_event_name() {
        let send = SendAction::new("TIMEOUT");
        assert_eq!(send.id, "TIMEOUT");

        let send = SendAction::new("TIMEOUT").with_id("t1").after_millis(1000);
        assert_eq!(send.id, "t1");
        assert_eq!(send.delay, Some(DelaySpec::Millis(1000)));
    }

    #[test]
    fn invoke_definitions_are_recognized() {
        let invoke = ActivityDef::invoke("fetch-1", "fetch");
        assert!(invoke.is_invoke());
        assert_eq!(invoke.src.as_deref(), Some("fetch"));

        let plain = ActivityDef::activity("ticker-1", "ticker");
        assert!(!plain.is_invoke());
        assert!(plain.src.is_none());
    }
}
