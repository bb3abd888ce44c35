//! # Child registry and supervision.
//!
//! Owns the children of one service and the spawn path for each child
//! kind.
//!
//! ## Architecture
//! ```text
//! Start action (invoke)            Registry
//!   ├─► InvokeSource::Machine  ──► spawn_child_service()  child interpreter,
//!   │                              done/update forwarded to the parent
//!   ├─► InvokeSource::Future   ──► spawn_future()         tokio task racing the
//!   │                              future against cancellation
//!   ├─► InvokeSource::Callback ──► spawn_callback()       setup runs inline,
//!   │                              listener slot carries parent → child events
//!   └─► plain activity         ──► spawn_activity()       dispose handle kept
//! ```
//!
//! ## Rules
//! - The parent owns its children (`Arc<ActorRef>` in the map); children
//!   hold the parent only weakly, so no ownership cycle forms.
//! - `forward_to ⊆ children` before and after every operation: removal
//!   always clears both.
//! - A future or callback that panics is reported like a rejection: the
//!   panic payload becomes `error.execution` data.
//! - Cancellation wins races: a child whose token was cancelled delivers
//!   nothing, even if its future had already settled.

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::actions::SendTarget;
use crate::actors::{
    ActorRef, BoxInvokeFuture, CallbackCleanup, CallbackFn, ChildListener, DisposeHandle,
    EventSender,
};
use crate::core::interpreter::{Interpreter, SpawnOptions};
use crate::diag::{dev_warn, report_unhandled_on_invocation};
use crate::error::InterpreterError;
use crate::events::{Notification, NotificationKind};
use crate::machine::{Event, Machine};

/// Children of one service, keyed by child id, plus the auto-forward set.
pub(crate) struct Registry {
    children: DashMap<String, Arc<ActorRef>>,
    forward_to: Mutex<Vec<String>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            children: DashMap::new(),
            forward_to: Mutex::new(Vec::new()),
        }
    }

    /// Registers a child; optionally adds it to the auto-forward set.
    pub(crate) fn insert(&self, actor: Arc<ActorRef>, auto_forward: bool) {
        let id = actor.id().to_string();
        self.children.insert(id.clone(), actor);
        if auto_forward {
            let mut forward = self.forward_to.lock();
            if !forward.contains(&id) {
                forward.push(id);
            }
        }
    }

    pub(crate) fn get(&self, id: &str) -> Option<Arc<ActorRef>> {
        self.children.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Auto-forward targets in insertion order.
    pub(crate) fn forward_ids(&self) -> Vec<String> {
        self.forward_to.lock().clone()
    }

    /// Stops and removes one child. Returns whether it existed.
    pub(crate) fn stop_child(&self, id: &str) -> bool {
        self.forward_to.lock().retain(|entry| entry != id);
        match self.children.remove(id) {
            Some((_, actor)) => {
                actor.stop();
                true
            }
            None => false,
        }
    }

    /// Stops and removes every child.
    pub(crate) fn stop_all(&self) {
        let ids: Vec<String> = self.children.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.stop_child(&id);
        }
    }

    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Spawns `machine` as a child service of `parent`: wires done (always)
/// and update (when subscribed) forwarding, starts the child, registers
/// the handle.
pub(crate) fn spawn_child_service(
    parent: &Interpreter,
    machine: Arc<dyn Machine>,
    options: SpawnOptions,
) -> Result<Arc<ActorRef>, InterpreterError> {
    let child_id = options
        .id
        .clone()
        .unwrap_or_else(|| machine.id().to_string());
    let child = Interpreter::new_child(machine, parent, child_id.clone());

    if options.subscribe {
        let weak = parent.downgrade();
        let id = child_id.clone();
        child.on_transition(move |state, _event| {
            let Some(parent) = weak.upgrade() else { return };
            if let Err(err) = parent.send(Event::child_update(&id, state)) {
                dev_warn!("dropping update from child \"{id}\": {err}");
            }
        });
    }

    {
        let weak = parent.downgrade();
        let id = child_id.clone();
        child.on_done(move |event| {
            let Some(parent) = weak.upgrade() else { return };
            if let Err(err) = parent.send(Event::done_invoke(&id, event.data.clone())) {
                dev_warn!("dropping completion of child \"{id}\": {err}");
            }
        });
    }

    match options.context {
        Some(context) => {
            let mut initial = child.initial_state();
            initial.context = context;
            child.start(Some(initial))?;
        }
        None => child.start(None)?,
    }

    let actor = Arc::new(ActorRef::service(child_id.clone(), child));
    parent.registry().insert(Arc::clone(&actor), options.auto_forward);
    parent.publish(
        Notification::now(NotificationKind::ChildSpawned)
            .with_service(parent.id())
            .with_child(child_id),
    );
    Ok(actor)
}

/// Supervises a promise-like child: the future runs as a tokio task and
/// its settlement is sent back to the parent unless cancelled first.
pub(crate) fn spawn_future(parent: &Interpreter, id: &str, future: BoxInvokeFuture) -> Arc<ActorRef> {
    let token = CancellationToken::new();
    let stop_token = token.clone();
    let actor = Arc::new(ActorRef::passive(
        id,
        Some(Box::new(move || stop_token.cancel())),
    ));

    let weak = parent.downgrade();
    let child_id = id.to_string();
    tokio::spawn(async move {
        let settled = std::panic::AssertUnwindSafe(future).catch_unwind();
        tokio::pin!(settled);
        let outcome = select! {
            _ = token.cancelled() => return,
            outcome = &mut settled => outcome,
        };
        if token.is_cancelled() {
            return;
        }
        let Some(service) = weak.upgrade() else { return };
        match outcome {
            Ok(Ok(value)) => {
                if let Err(err) = service.send(Event::done_invoke(&child_id, value)) {
                    dev_warn!("dropping completion of child \"{child_id}\": {err}");
                }
            }
            Ok(Err(reason)) => deliver_invoke_error(&service, &child_id, reason),
            Err(panic) => deliver_invoke_error(&service, &child_id, panic_to_value(panic)),
        }
    });

    parent.registry().insert(Arc::clone(&actor), false);
    parent.publish(
        Notification::now(NotificationKind::ChildSpawned)
            .with_service(parent.id())
            .with_child(id),
    );
    actor
}

/// Supervises a callback child: runs its setup inline, keeps whatever
/// listener it registers as the parent → child path, and watches a
/// returned future for rejection.
pub(crate) fn spawn_callback(parent: &Interpreter, id: &str, callback: CallbackFn) -> Arc<ActorRef> {
    let token = CancellationToken::new();
    let slot: Arc<Mutex<Option<ChildListener>>> = Arc::new(Mutex::new(None));

    let send_back: EventSender = {
        let weak = parent.downgrade();
        let child_id = id.to_string();
        let token = token.clone();
        Arc::new(move |event: Event| {
            if token.is_cancelled() {
                return;
            }
            let Some(service) = weak.upgrade() else { return };
            if let Err(err) = service.send(event) {
                dev_warn!("callback child \"{child_id}\" failed to deliver an event: {err}");
            }
        })
    };

    let mut registrar = {
        let slot = Arc::clone(&slot);
        move |listener: ChildListener| {
            *slot.lock() = Some(listener);
        }
    };

    let outcome =
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(send_back, &mut registrar)));

    let mut cleanup: Option<DisposeHandle> = None;
    match outcome {
        Ok(CallbackCleanup::Forget) => {}
        Ok(CallbackCleanup::Stop(dispose)) => cleanup = Some(dispose),
        Ok(CallbackCleanup::Pending(future)) => {
            let weak = parent.downgrade();
            let child_id = id.to_string();
            let watch = token.clone();
            tokio::spawn(async move {
                let settled = std::panic::AssertUnwindSafe(future).catch_unwind();
                tokio::pin!(settled);
                let outcome = select! {
                    _ = watch.cancelled() => return,
                    outcome = &mut settled => outcome,
                };
                if watch.is_cancelled() {
                    return;
                }
                let Some(service) = weak.upgrade() else { return };
                match outcome {
                    Ok(Ok(_)) => {}
                    Ok(Err(reason)) => deliver_invoke_error(&service, &child_id, reason),
                    Err(panic) => deliver_invoke_error(&service, &child_id, panic_to_value(panic)),
                }
            });
        }
        Err(panic) => deliver_invoke_error(parent, id, panic_to_value(panic)),
    }

    let stop: DisposeHandle = Box::new(move || {
        token.cancel();
        if let Some(dispose) = cleanup {
            dispose();
        }
    });

    let actor = Arc::new(ActorRef::with_listener(id, slot, Some(stop)));
    parent.registry().insert(Arc::clone(&actor), false);
    parent.publish(
        Notification::now(NotificationKind::ChildSpawned)
            .with_service(parent.id())
            .with_child(id),
    );
    actor
}

/// Starts a plain activity: resolves the implementation by activity type
/// and keeps its dispose handle as the child's stop.
pub(crate) fn spawn_activity(
    parent: &Interpreter,
    context: &Value,
    activity: &crate::actions::ActivityDef,
) {
    let machine = Arc::clone(parent.machine());
    let Some(implementation) = machine.options().activities.get(&activity.activity_type) else {
        dev_warn!(
            "no implementation found for activity \"{}\" on service \"{}\"",
            activity.activity_type,
            parent.id()
        );
        return;
    };

    let dispose = implementation(context, activity);
    let actor = Arc::new(ActorRef::passive(activity.id.clone(), dispose));
    parent.registry().insert(actor, false);
    parent.publish(
        Notification::now(NotificationKind::ChildSpawned)
            .with_service(parent.id())
            .with_child(activity.id.clone()),
    );
}

/// Routes an event to a send target: the parent sentinel or a named
/// child.
pub(crate) fn send_to(
    service: &Interpreter,
    event: &Event,
    target: &SendTarget,
) -> Result<(), InterpreterError> {
    match target {
        SendTarget::Parent => match service.parent() {
            Some(parent) => parent.send(event.clone()).map(|_| ()),
            None => {
                dev_warn!(
                    "service \"{}\" has no parent; dropping event \"{}\"",
                    service.id(),
                    event.name
                );
                Ok(())
            }
        },
        SendTarget::Child(child) => match service.registry().get(child) {
            Some(actor) => actor.send(event),
            None => Err(InterpreterError::UnknownChild {
                service: service.id().to_string(),
                child: child.clone(),
            }),
        },
    }
}

/// Delivers `event` to every auto-forward child.
pub(crate) fn forward(service: &Interpreter, event: &Event) -> Result<(), InterpreterError> {
    for id in service.registry().forward_ids() {
        let Some(actor) = service.registry().get(&id) else {
            return Err(InterpreterError::ForwardTargetMissing {
                service: service.id().to_string(),
                child: id,
            });
        };
        actor.send(event)?;
    }
    Ok(())
}

/// Sends `error.execution` back to the service. When no state handles
/// it, reports the unhandled diagnostic and, for strict machines, stops
/// the service.
fn deliver_invoke_error(service: &Interpreter, child: &str, reason: Value) {
    match service.send(Event::error_execution(child, reason.clone())) {
        Ok(_) => {}
        Err(InterpreterError::UnhandledError { data, .. }) => {
            report_unhandled_on_invocation(&reason, &data, child);
            if service.machine().strict() {
                service.stop();
            }
        }
        Err(err) => {
            dev_warn!("failed to deliver error from child \"{child}\": {err}");
        }
    }
}

/// Renders a panic payload as error data (string message when one was
/// carried).
fn panic_to_value(panic: Box<dyn Any + Send>) -> Value {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        Value::String((*message).to_string())
    } else if let Some(message) = panic.downcast_ref::<String>() {
        Value::String(message.clone())
    } else {
        Value::String("unknown panic".to_string())
    }
}
