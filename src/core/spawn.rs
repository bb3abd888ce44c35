//! # Spawn context: child creation from inside transition code.
//!
//! While a service computes a transition, it sits on a thread-local
//! stack of "currently transitioning" services. The top-level [`spawn`]
//! helper consults the top of that stack, letting machine code create
//! children without holding an explicit service handle.
//!
//! The stack is thread-local because a transition is always computed
//! synchronously on the caller's thread; nested child transitions push
//! and pop in strict LIFO order, guarded against unwinds by a drop
//! guard.

use std::cell::RefCell;
use std::sync::Arc;

use crate::actors::ActorRef;
use crate::core::interpreter::{Interpreter, SpawnOptions, WeakService};
use crate::error::InterpreterError;
use crate::machine::{Event, Machine};

thread_local! {
    static SPAWN_SCOPE: RefCell<Vec<WeakService>> = const { RefCell::new(Vec::new()) };
}

struct ScopeGuard;

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SPAWN_SCOPE.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Runs `f` with `service` on top of the spawn-context stack.
pub(crate) fn with_service_scope<T>(service: &Interpreter, f: impl FnOnce() -> T) -> T {
    SPAWN_SCOPE.with(|stack| stack.borrow_mut().push(service.downgrade()));
    let _guard = ScopeGuard;
    f()
}

fn current_service() -> Option<Interpreter> {
    SPAWN_SCOPE
        .with(|stack| stack.borrow().last().cloned())
        .and_then(|weak| weak.upgrade())
}

/// Lightweight descriptor of a child spawned through the spawn context.
#[derive(Debug)]
pub struct SpawnedChild {
    /// Id the child is registered under.
    pub id: String,
    /// Id of the parent service it was spawned on.
    pub parent: String,
    actor: Arc<ActorRef>,
}

impl SpawnedChild {
    /// Sends an event to the spawned child.
    pub fn send(&self, event: impl Into<Event>) -> Result<(), InterpreterError> {
        self.actor.send(&event.into())
    }
}

/// Spawns `machine` as a subscribed child of the service currently
/// computing a transition.
///
/// Returns `Ok(None)` when no transition is in progress on this thread:
/// outside a transition there is no service to attach the child to, and
/// the call is a no-op.
pub fn spawn(
    machine: Arc<dyn Machine>,
    id: Option<&str>,
) -> Result<Option<SpawnedChild>, InterpreterError> {
    let Some(service) = current_service() else {
        return Ok(None);
    };
    let actor = service.spawn(
        machine,
        SpawnOptions {
            id: id.map(str::to_string),
            subscribe: true,
            ..SpawnOptions::default()
        },
    )?;
    Ok(Some(SpawnedChild {
        id: actor.id().to_string(),
        parent: service.id().to_string(),
        actor,
    }))
}
