//! # Interpreter: a live binding of a machine to a runtime.
//!
//! The [`Interpreter`] owns the current state, drives the pure machine
//! against incoming events, and wires the other runtime components
//! together.
//!
//! ## Architecture
//! ```text
//! send(event) ──► Scheduler (run-to-completion queue)
//!                    │
//!                    ├─► machine.transition(state, event)   (spawn scope active)
//!                    ├─► update(next, event)
//!                    │     ├─► execute actions ──► Executor
//!                    │     │        ├─► TimerRegistry (delayed sends)
//!                    │     │        └─► Registry (child actors)
//!                    │     ├─► dev-tools, then listener sets in order:
//!                    │     │   event → transition → change → done
//!                    │     └─► done? → stop()
//!                    └─► forward(event) to auto-forward children
//! ```
//!
//! ## Rules
//! - Exactly one state is current after `start`; before `start` the
//!   state is readable as the machine's initial state but unobservable
//!   through listeners.
//! - `transition` is never re-entered for one service: everything goes
//!   through the scheduler.
//! - Listener sets are iterated in insertion order over a snapshot, so a
//!   listener added during notification first fires for the next event.
//! - A service cannot be restarted into the same identity; construct a
//!   new interpreter instead.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;

use super::executor::execute_action;
use super::registry::{forward, spawn_child_service, Registry};
use super::scheduler::Scheduler;
use super::spawn::with_service_scope;
use super::timers::TimerRegistry;
use crate::actors::ActorRef;
use crate::clock::Clock;
use crate::config::InterpreterOptions;
use crate::devtools::DevTools;
use crate::diag::dev_warn;
use crate::error::InterpreterError;
use crate::events::{Bus, Notification, NotificationKind};
use crate::logger::Logger;
use crate::machine::{Event, Machine, State};

/// Identifies one registered listener; returned by the `on_*` methods
/// and consumed by [`Interpreter::off`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type TransitionListener = Arc<dyn Fn(&State, &Event) + Send + Sync>;
type EventListener = Arc<dyn Fn(&Event) + Send + Sync>;
type ChangeListener = Arc<dyn Fn(&Value, Option<&Value>) + Send + Sync>;
type StopListener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Listeners {
    transition: Vec<(ListenerId, TransitionListener)>,
    event: Vec<(ListenerId, EventListener)>,
    send: Vec<(ListenerId, EventListener)>,
    change: Vec<(ListenerId, ChangeListener)>,
    done: Vec<(ListenerId, EventListener)>,
    stop: Vec<(ListenerId, StopListener)>,
}

/// Options for spawning a child machine on a running service.
#[derive(Clone, Debug, Default)]
pub struct SpawnOptions {
    /// Child id; defaults to the child machine's id.
    pub id: Option<String>,
    /// Auto-forward events accepted by the parent to this child.
    pub auto_forward: bool,
    /// Propagate the child's transitions to the parent as update events.
    pub subscribe: bool,
    /// Replace the child's initial context before it starts.
    pub context: Option<Value>,
}

struct Inner {
    machine: Arc<dyn Machine>,
    id: String,
    parent: Option<WeakService>,
    execute: bool,
    defer_events: bool,
    bus_capacity: usize,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
    dev_tools: Option<Arc<dyn DevTools>>,
    scheduler: Scheduler,
    timers: TimerRegistry,
    registry: Registry,
    bus: Bus,
    state: Mutex<Option<State>>,
    initialized: AtomicBool,
    listeners: Mutex<Listeners>,
    listener_seq: AtomicU64,
}

/// Non-owning handle to a service; children and timers hold these.
#[derive(Clone)]
pub(crate) struct WeakService(Weak<Inner>);

impl WeakService {
    pub(crate) fn upgrade(&self) -> Option<Interpreter> {
        self.0.upgrade().map(|inner| Interpreter { inner })
    }
}

/// A live service: one machine bound to one runtime identity.
///
/// Cloning is cheap and yields another handle to the same service.
#[derive(Clone)]
pub struct Interpreter {
    inner: Arc<Inner>,
}

/// Binds `machine` to a new service with default options.
///
/// The service is created stopped; call [`Interpreter::start`] to begin
/// processing events.
pub fn interpret(machine: Arc<dyn Machine>) -> Interpreter {
    Interpreter::new(machine, InterpreterOptions::default())
}

impl Interpreter {
    /// Binds `machine` to a new service with the given options.
    pub fn new(machine: Arc<dyn Machine>, options: InterpreterOptions) -> Self {
        Self::build(machine, options, None)
    }

    /// Constructs a child service inheriting the parent's runtime
    /// options under its own identity.
    pub(crate) fn new_child(
        machine: Arc<dyn Machine>,
        parent: &Interpreter,
        id: String,
    ) -> Self {
        let options = InterpreterOptions {
            execute: parent.inner.execute,
            defer_events: parent.inner.defer_events,
            clock: Arc::clone(&parent.inner.clock),
            logger: Arc::clone(&parent.inner.logger),
            dev_tools: parent.inner.dev_tools.clone(),
            id: Some(id),
            bus_capacity: parent.inner.bus_capacity,
        };
        Self::build(machine, options, Some(parent.downgrade()))
    }

    fn build(
        machine: Arc<dyn Machine>,
        options: InterpreterOptions,
        parent: Option<WeakService>,
    ) -> Self {
        let id = options
            .id
            .clone()
            .unwrap_or_else(|| machine.id().to_string());
        let bus_capacity = options.bus_capacity_clamped();
        Self {
            inner: Arc::new(Inner {
                timers: TimerRegistry::new(Arc::clone(&options.clock)),
                registry: Registry::new(),
                scheduler: Scheduler::new(),
                bus: Bus::new(bus_capacity),
                state: Mutex::new(None),
                initialized: AtomicBool::new(false),
                listeners: Mutex::new(Listeners::default()),
                listener_seq: AtomicU64::new(0),
                execute: options.execute,
                defer_events: options.defer_events,
                clock: options.clock,
                logger: options.logger,
                dev_tools: options.dev_tools,
                bus_capacity,
                machine,
                parent,
                id,
            }),
        }
    }

    /// The service identifier.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The bound machine.
    pub fn machine(&self) -> &Arc<dyn Machine> {
        &self.inner.machine
    }

    /// Whether the service is between `start` and `stop`.
    pub fn initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    /// The machine's initial state (readable before `start`).
    pub fn initial_state(&self) -> State {
        self.inner.machine.initial_state()
    }

    /// The current state, or the machine's initial state before `start`.
    pub fn state(&self) -> State {
        self.inner
            .state
            .lock()
            .clone()
            .unwrap_or_else(|| self.initial_state())
    }

    /// Number of live children.
    pub fn child_count(&self) -> usize {
        self.inner.registry.child_count()
    }

    /// Number of outstanding delayed sends.
    pub fn outstanding_delays(&self) -> usize {
        self.inner.timers.outstanding()
    }

    /// Subscribes to the service's lifecycle notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.inner.bus.subscribe()
    }

    /// Starts the service: resolves the initial state (the machine's
    /// own, or the supplied one passed through the machine's resolver)
    /// and performs the initial update through the scheduler. Events
    /// deferred before start are processed right after it, in order.
    ///
    /// Starting a started service is a no-op.
    pub fn start(&self, initial: Option<State>) -> Result<(), InterpreterError> {
        if self.initialized() {
            return Ok(());
        }
        let resolved = match initial {
            Some(state) => self.inner.machine.resolve_state(state),
            None => self.inner.machine.initial_state(),
        };
        self.inner.initialized.store(true, Ordering::SeqCst);
        if let Some(dev_tools) = &self.inner.dev_tools {
            dev_tools.init(&resolved);
        }
        self.publish(
            Notification::now(NotificationKind::Started)
                .with_service(self.id())
                .with_state(&resolved.value),
        );

        let service = self.clone();
        self.inner
            .scheduler
            .initialize(Box::new(move || service.update(resolved, Event::init())))
    }

    /// Stops the service: empties the listener sets (running each stop
    /// listener exactly once as it is removed), stops every child,
    /// cancels every outstanding delayed send, and marks the service
    /// uninitialized. Idempotent.
    pub fn stop(&self) {
        let drained = std::mem::take(&mut *self.inner.listeners.lock());
        for (_, listener) in drained.stop {
            listener();
        }
        self.inner.registry.stop_all();
        self.inner.timers.cancel_all();
        self.inner.scheduler.clear();
        self.inner.initialized.store(false, Ordering::SeqCst);
        self.publish(Notification::now(NotificationKind::Stopped).with_service(self.id()));
    }

    /// Sends an event to the service.
    ///
    /// The transition runs immediately when the service is idle, or is
    /// queued behind the transition currently in progress. Returns the
    /// current state after any synchronous processing.
    ///
    /// # Errors
    /// - [`InterpreterError::NotStarted`] when sent before `start` with
    ///   deferral disabled.
    /// - [`InterpreterError::UnhandledError`] when an `error.execution`
    ///   event arrives and the current state cannot handle it; the
    ///   carried error surfaces here instead of being swallowed.
    /// - Errors raised while executing the resulting actions.
    pub fn send(&self, event: impl Into<Event>) -> Result<State, InterpreterError> {
        let event = event.into();
        self.notify_send(&event);

        if !self.initialized() {
            if self.inner.defer_events {
                dev_warn!(
                    "event \"{}\" was sent to uninitialized service \"{}\" and is deferred until start",
                    event.name,
                    self.inner.id
                );
            } else {
                return Err(InterpreterError::NotStarted {
                    service: self.inner.id.clone(),
                    event: event.name,
                });
            }
        } else if event.is_error() && !self.state().accepts(&event.name) {
            return Err(InterpreterError::UnhandledError {
                service: self.inner.id.clone(),
                data: event.data,
            });
        }

        self.publish(
            Notification::now(NotificationKind::EventReceived)
                .with_service(self.id())
                .with_event(event.name.clone()),
        );

        let service = self.clone();
        self.inner.scheduler.schedule(Box::new(move || {
            // The service may have stopped while this task sat queued.
            if !service.initialized() {
                return Ok(());
            }
            let current = service.state();
            let next =
                with_service_scope(&service, || service.inner.machine.transition(&current, &event));
            service.update(next, event.clone())?;
            forward(&service, &event)
        }))?;

        Ok(self.state())
    }

    /// Sends an ordered batch of events processed as one observable
    /// update.
    ///
    /// The events fold through the machine in order; actions produced by
    /// intermediate states are carried forward and executed once against
    /// the final state. Each event is still forwarded to auto-forward
    /// children individually. Listeners observe a single notification,
    /// published with the last event of the batch.
    pub fn send_batch(&self, events: Vec<Event>) -> Result<State, InterpreterError> {
        if events.is_empty() {
            return Ok(self.state());
        }
        for event in &events {
            self.notify_send(event);
        }

        if !self.initialized() {
            if self.inner.defer_events {
                dev_warn!(
                    "a batch of {} events was sent to uninitialized service \"{}\" and is deferred until start",
                    events.len(),
                    self.inner.id
                );
            } else {
                return Err(InterpreterError::NotStarted {
                    service: self.inner.id.clone(),
                    event: events[0].name.clone(),
                });
            }
        }

        let service = self.clone();
        self.inner.scheduler.schedule(Box::new(move || {
            if !service.initialized() {
                return Ok(());
            }
            let mut current = service.state();
            let mut pending = Vec::new();
            let mut last_event = None;
            for event in events {
                let next = with_service_scope(&service, || {
                    service.inner.machine.transition(&current, &event)
                });
                pending.extend(next.actions.iter().cloned());
                current = next;
                forward(&service, &event)?;
                last_event = Some(event);
            }
            let Some(last_event) = last_event else {
                return Ok(());
            };
            current.actions = pending;
            service.update(current, last_event)
        }))?;

        Ok(self.state())
    }

    /// Returns a reusable trigger that sends `event` on each call.
    pub fn sender(
        &self,
        event: impl Into<Event>,
    ) -> impl Fn() -> Result<State, InterpreterError> + Send + Sync + 'static {
        let service = self.clone();
        let event = event.into();
        move || service.send(event.clone())
    }

    /// Computes the state `event` would produce, without mutating the
    /// service or executing any effect.
    pub fn next_state(&self, event: &Event) -> State {
        self.inner.machine.transition(&self.state(), event)
    }

    /// Spawns `machine` as a child of this service.
    pub fn spawn(
        &self,
        machine: Arc<dyn Machine>,
        options: SpawnOptions,
    ) -> Result<Arc<ActorRef>, InterpreterError> {
        spawn_child_service(self, machine, options)
    }

    // ---- Listener registration ----

    /// Registers a listener for every state update.
    pub fn on_transition(
        &self,
        listener: impl Fn(&State, &Event) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self.next_listener_id();
        self.inner
            .listeners
            .lock()
            .transition
            .push((id, Arc::new(listener)));
        id
    }

    /// Registers a listener for every event delivered by an update.
    pub fn on_event(&self, listener: impl Fn(&Event) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_listener_id();
        self.inner
            .listeners
            .lock()
            .event
            .push((id, Arc::new(listener)));
        id
    }

    /// Registers a listener for every event submitted through `send`.
    pub fn on_send(&self, listener: impl Fn(&Event) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_listener_id();
        self.inner
            .listeners
            .lock()
            .send
            .push((id, Arc::new(listener)));
        id
    }

    /// Registers a listener observing (context, previous context) on
    /// every update.
    pub fn on_change(
        &self,
        listener: impl Fn(&Value, Option<&Value>) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self.next_listener_id();
        self.inner
            .listeners
            .lock()
            .change
            .push((id, Arc::new(listener)));
        id
    }

    /// Registers a listener for the service reaching a final state.
    pub fn on_done(&self, listener: impl Fn(&Event) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_listener_id();
        self.inner
            .listeners
            .lock()
            .done
            .push((id, Arc::new(listener)));
        id
    }

    /// Registers a listener for the service stopping.
    pub fn on_stop(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
        let id = self.next_listener_id();
        self.inner
            .listeners
            .lock()
            .stop
            .push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener from whichever set holds it.
    pub fn off(&self, id: ListenerId) {
        let mut listeners = self.inner.listeners.lock();
        listeners.transition.retain(|(entry, _)| *entry != id);
        listeners.event.retain(|(entry, _)| *entry != id);
        listeners.send.retain(|(entry, _)| *entry != id);
        listeners.change.retain(|(entry, _)| *entry != id);
        listeners.done.retain(|(entry, _)| *entry != id);
        listeners.stop.retain(|(entry, _)| *entry != id);
    }

    // ---- Internal machinery ----

    /// Makes `state` current: executes its actions (unless execution is
    /// disabled), then notifies dev-tools and the listener sets in
    /// order. Entering a final state fires done listeners and stops the
    /// service.
    pub(crate) fn update(&self, state: State, event: Event) -> Result<(), InterpreterError> {
        *self.inner.state.lock() = Some(state.clone());

        if self.inner.execute {
            for action in &state.actions {
                execute_action(self, &state, action)?;
            }
        }

        if let Some(dev_tools) = &self.inner.dev_tools {
            dev_tools.send(&event, &state);
        }
        self.publish(
            Notification::now(NotificationKind::Transitioned)
                .with_service(self.id())
                .with_state(&state.value)
                .with_event(event.name.clone()),
        );

        let event_listeners: Vec<EventListener> = {
            let listeners = self.inner.listeners.lock();
            listeners.event.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in event_listeners {
            listener(&state.event);
        }

        let transition_listeners: Vec<TransitionListener> = {
            let listeners = self.inner.listeners.lock();
            listeners
                .transition
                .iter()
                .map(|(_, l)| Arc::clone(l))
                .collect()
        };
        for listener in transition_listeners {
            listener(&state, &state.event);
        }

        let change_listeners: Vec<ChangeListener> = {
            let listeners = self.inner.listeners.lock();
            listeners
                .change
                .iter()
                .map(|(_, l)| Arc::clone(l))
                .collect()
        };
        let previous = state.history.as_deref().map(|h| &h.context);
        for listener in change_listeners {
            listener(&state.context, previous);
        }

        if state.done {
            let data = match &state.done_data {
                Some(done_data) => done_data(&state.context, &event),
                None => Value::Null,
            };
            let done_event = Event::done_invoke(self.id(), data);
            let done_listeners: Vec<EventListener> = {
                let listeners = self.inner.listeners.lock();
                listeners.done.iter().map(|(_, l)| Arc::clone(l)).collect()
            };
            for listener in done_listeners {
                listener(&done_event);
            }
            self.publish(
                Notification::now(NotificationKind::Done)
                    .with_service(self.id())
                    .with_state(&state.value),
            );
            self.stop();
        }
        Ok(())
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub(crate) fn timers(&self) -> &TimerRegistry {
        &self.inner.timers
    }

    pub(crate) fn logger(&self) -> &Arc<dyn Logger> {
        &self.inner.logger
    }

    pub(crate) fn parent(&self) -> Option<Interpreter> {
        self.inner.parent.as_ref().and_then(WeakService::upgrade)
    }

    pub(crate) fn downgrade(&self) -> WeakService {
        WeakService(Arc::downgrade(&self.inner))
    }

    pub(crate) fn publish(&self, notification: Notification) {
        self.inner.bus.publish(notification);
    }

    fn notify_send(&self, event: &Event) {
        let send_listeners: Vec<EventListener> = {
            let listeners = self.inner.listeners.lock();
            listeners.send.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in send_listeners {
            listener(event);
        }
    }

    fn next_listener_id(&self) -> ListenerId {
        ListenerId(self.inner.listener_seq.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("id", &self.inner.id)
            .field("initialized", &self.initialized())
            .field("children", &self.child_count())
            .finish_non_exhaustive()
    }
}
