//! # State values produced by a machine.
//!
//! A [`State`] is a pure value: the interpreter never mutates one, it
//! only replaces its current state with the next one the machine
//! returns. The `with_*` builders exist for machine implementations and
//! tests; application code usually only reads states.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::event::Event;
use crate::actions::Action;

/// Computes the done-data published when a final state is entered.
pub type DoneDataFn = Arc<dyn Fn(&Value, &Event) -> Value + Send + Sync>;

/// Current configuration of a statechart: a leaf state name or a nested
/// mapping of region → child configuration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StateValue {
    /// A single atomic state.
    Leaf(String),
    /// Compound/parallel configuration, keyed by region name.
    Compound(BTreeMap<String, StateValue>),
}

impl StateValue {
    /// Renders the configuration as JSON (`"a"` or `{"region": ...}`).
    pub fn as_json(&self) -> Value {
        match self {
            StateValue::Leaf(name) => Value::String(name.clone()),
            StateValue::Compound(regions) => Value::Object(
                regions
                    .iter()
                    .map(|(region, value)| (region.clone(), value.as_json()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for StateValue {
    fn from(name: &str) -> Self {
        StateValue::Leaf(name.to_string())
    }
}

impl From<String> for StateValue {
    fn from(name: String) -> Self {
        StateValue::Leaf(name)
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Leaf(name) => f.write_str(name),
            StateValue::Compound(_) => write!(f, "{}", self.as_json()),
        }
    }
}

/// One resolved state of a machine bound to the event that produced it.
#[derive(Clone)]
pub struct State {
    /// Current configuration.
    pub value: StateValue,
    /// User data carried by the machine.
    pub context: Value,
    /// The event that produced this state.
    pub event: Event,
    /// Ordered actions to execute on entry into this state.
    pub actions: Vec<Action>,
    /// Activity id → whether the activity is active in this state.
    pub activities: HashMap<String, bool>,
    /// The previous state, if any.
    pub history: Option<Arc<State>>,
    /// Whether this is a final state.
    pub done: bool,
    /// Producer of the done-data published when `done` holds.
    pub done_data: Option<DoneDataFn>,
    /// Event names the machine can handle from this state.
    pub next_events: Vec<String>,
}

impl State {
    /// Creates a bare state with the given configuration.
    pub fn new(value: impl Into<StateValue>) -> Self {
        Self {
            value: value.into(),
            context: Value::Null,
            event: Event::init(),
            actions: Vec::new(),
            activities: HashMap::new(),
            history: None,
            done: false,
            done_data: None,
            next_events: Vec::new(),
        }
    }

    /// Sets the context.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Sets the producing event.
    #[must_use]
    pub fn with_event(mut self, event: Event) -> Self {
        self.event = event;
        self
    }

    /// Sets the entry actions.
    #[must_use]
    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    /// Marks the given activity ids active in this state.
    #[must_use]
    pub fn with_active(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for id in ids {
            self.activities.insert(id.into(), true);
        }
        self
    }

    /// Records the previous state.
    #[must_use]
    pub fn with_history(mut self, previous: State) -> Self {
        self.history = Some(Arc::new(previous));
        self
    }

    /// Marks this state final.
    #[must_use]
    pub fn with_done(mut self) -> Self {
        self.done = true;
        self
    }

    /// Marks this state final with a done-data producer.
    #[must_use]
    pub fn with_done_data(mut self, done_data: DoneDataFn) -> Self {
        self.done = true;
        self.done_data = Some(done_data);
        self
    }

    /// Declares the event names handled from this state.
    #[must_use]
    pub fn with_next_events(mut self, events: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.next_events = events.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the machine can handle `event_name` from this state.
    pub fn accepts(&self, event_name: &str) -> bool {
        self.next_events.iter().any(|name| name == event_name)
    }

    /// Whether the given activity id is active in this state.
    pub fn activity_active(&self, id: &str) -> bool {
        self.activities.get(id).copied().unwrap_or(false)
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("value", &self.value)
            .field("context", &self.context)
            .field("event", &self.event)
            .field("actions", &self.actions)
            .field("done", &self.done)
            .field("next_events", &self.next_events)
            .finish_non_exhaustive()
    }
}
