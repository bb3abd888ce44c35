//! Shared test support: a small table-driven machine.
//!
//! `TestMachine` implements the `Machine` contract from a flat table of
//! states, transitions, and actions — enough statechart to drive the
//! interpreter without dragging in a real compiler.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use statevisor::{Action, Event, Machine, MachineOptions, State, StateValue};

/// Shared ordered log of observed effects.
pub type EffectLog = Arc<Mutex<Vec<String>>>;

pub fn effect_log() -> EffectLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Custom action recording `label:<event>` when executed.
pub fn record_action(label: &'static str, log: &EffectLog) -> Action {
    let log = Arc::clone(log);
    Action::custom(label, move |_, event, _| {
        log.lock().push(format!("{label}:{}", event.name));
    })
}

/// Custom action recording `label@<state>:<event>` when executed.
pub fn record_action_with_state(label: &'static str, log: &EffectLog) -> Action {
    let log = Arc::clone(log);
    Action::custom(label, move |_, event, meta| {
        log.lock()
            .push(format!("{label}@{}:{}", meta.state.value, event.name));
    })
}

pub struct TransitionSpec {
    pub target: String,
    pub actions: Vec<Action>,
    pub assign: Option<Value>,
}

#[derive(Default)]
pub struct StateSpec {
    on: Vec<(String, TransitionSpec)>,
    entry: Vec<Action>,
    exit: Vec<Action>,
    activities: Vec<String>,
    done: bool,
    done_data: Option<Value>,
    done_with_context: bool,
}

impl StateSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, event: &str, target: &str) -> Self {
        self.on.push((
            event.to_string(),
            TransitionSpec {
                target: target.to_string(),
                actions: Vec::new(),
                assign: None,
            },
        ));
        self
    }

    pub fn on_with(mut self, event: &str, target: &str, actions: Vec<Action>) -> Self {
        self.on.push((
            event.to_string(),
            TransitionSpec {
                target: target.to_string(),
                actions,
                assign: None,
            },
        ));
        self
    }

    pub fn on_assign(mut self, event: &str, target: &str, context: Value) -> Self {
        self.on.push((
            event.to_string(),
            TransitionSpec {
                target: target.to_string(),
                actions: Vec::new(),
                assign: Some(context),
            },
        ));
        self
    }

    pub fn entry(mut self, actions: Vec<Action>) -> Self {
        self.entry = actions;
        self
    }

    pub fn exit(mut self, actions: Vec<Action>) -> Self {
        self.exit = actions;
        self
    }

    /// Marks activity ids active while in this state.
    pub fn active(mut self, ids: &[&str]) -> Self {
        self.activities = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn done(mut self) -> Self {
        self.done = true;
        self
    }

    pub fn done_data(mut self, data: Value) -> Self {
        self.done = true;
        self.done_data = Some(data);
        self
    }

    /// Final state whose done-data is the context at completion time.
    pub fn done_with_context(mut self) -> Self {
        self.done = true;
        self.done_with_context = true;
        self
    }
}

pub struct TestMachine {
    id: String,
    initial: String,
    context: Value,
    states: HashMap<String, StateSpec>,
    options: MachineOptions,
    strict: bool,
}

pub struct MachineBuilder {
    machine: TestMachine,
}

impl MachineBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            machine: TestMachine {
                id: id.to_string(),
                initial: String::new(),
                context: Value::Null,
                states: HashMap::new(),
                options: MachineOptions::default(),
                strict: false,
            },
        }
    }

    pub fn initial(mut self, name: &str) -> Self {
        self.machine.initial = name.to_string();
        self
    }

    pub fn context(mut self, context: Value) -> Self {
        self.machine.context = context;
        self
    }

    pub fn options(mut self, options: MachineOptions) -> Self {
        self.machine.options = options;
        self
    }

    pub fn strict(mut self) -> Self {
        self.machine.strict = true;
        self
    }

    pub fn state(mut self, name: &str, spec: StateSpec) -> Self {
        self.machine.states.insert(name.to_string(), spec);
        self
    }

    pub fn build(self) -> Arc<TestMachine> {
        assert!(
            self.machine.states.contains_key(&self.machine.initial),
            "initial state must be defined"
        );
        Arc::new(self.machine)
    }
}

impl TestMachine {
    fn leaf_name(value: &StateValue) -> &str {
        match value {
            StateValue::Leaf(name) => name,
            StateValue::Compound(_) => panic!("TestMachine only models leaf configurations"),
        }
    }

    fn state_for(
        &self,
        name: &str,
        context: Value,
        event: Event,
        history: Option<State>,
        actions: Vec<Action>,
    ) -> State {
        let spec = &self.states[name];
        let mut state = State::new(name)
            .with_context(context)
            .with_event(event)
            .with_actions(actions)
            .with_active(spec.activities.iter().cloned())
            .with_next_events(spec.on.iter().map(|(event, _)| event.clone()));
        if let Some(previous) = history {
            state = state.with_history(previous);
        }
        if spec.done {
            state = if spec.done_with_context {
                state.with_done_data(Arc::new(|context: &Value, _: &Event| context.clone()))
            } else if let Some(data) = &spec.done_data {
                let data = data.clone();
                state.with_done_data(Arc::new(move |_: &Value, _: &Event| data.clone()))
            } else {
                state.with_done()
            };
        }
        state
    }
}

impl Machine for TestMachine {
    fn id(&self) -> &str {
        &self.id
    }

    fn initial_state(&self) -> State {
        let entry = self.states[&self.initial].entry.clone();
        self.state_for(
            &self.initial,
            self.context.clone(),
            Event::init(),
            None,
            entry,
        )
    }

    fn resolve_state(&self, state: State) -> State {
        let name = Self::leaf_name(&state.value).to_string();
        let entry = self.states[&name].entry.clone();
        self.state_for(&name, state.context, state.event, None, entry)
    }

    fn transition(&self, state: &State, event: &Event) -> State {
        let current = Self::leaf_name(&state.value);
        let spec = &self.states[current];

        let Some((_, transition)) = spec.on.iter().find(|(name, _)| name == &event.name) else {
            // Unhandled event: same configuration, no actions.
            let mut unchanged = state.clone();
            unchanged.event = event.clone();
            unchanged.actions = Vec::new();
            return unchanged;
        };

        let target = &self.states[&transition.target];
        let mut actions = spec.exit.clone();
        actions.extend(transition.actions.iter().cloned());
        actions.extend(target.entry.iter().cloned());

        let context = transition
            .assign
            .clone()
            .unwrap_or_else(|| state.context.clone());

        self.state_for(
            &transition.target,
            context,
            event.clone(),
            Some(state.clone()),
            actions,
        )
    }

    fn options(&self) -> &MachineOptions {
        &self.options
    }

    fn strict(&self) -> bool {
        self.strict
    }
}
