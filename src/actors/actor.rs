//! # The uniform child handle.
//!
//! ## Rules
//! - `send` on a passive child (future, activity) drops the event.
//! - `stop` runs the teardown at most once; later calls are no-ops.
//! - The handle holds the child *strongly*: a parent owns its children.
//!   Children reference their parent only weakly (see the registry).

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::source::{ChildListener, DisposeHandle};
use crate::core::Interpreter;
use crate::error::InterpreterError;
use crate::machine::Event;

/// How events reach the child, when they can at all.
pub(crate) enum ActorSender {
    /// Child service: events go through its own interpreter queue.
    Service(Interpreter),
    /// Callback child: events go to the listener it last registered.
    Listener(Arc<Mutex<Option<ChildListener>>>),
}

/// Uniform handle to a supervised child.
pub struct ActorRef {
    id: String,
    sender: Option<ActorSender>,
    stop: Mutex<Option<DisposeHandle>>,
}

impl ActorRef {
    /// Handle over a child service; stopping the handle stops the service.
    pub(crate) fn service(id: impl Into<String>, service: Interpreter) -> Self {
        let stopper = service.clone();
        Self {
            id: id.into(),
            sender: Some(ActorSender::Service(service)),
            stop: Mutex::new(Some(Box::new(move || stopper.stop()))),
        }
    }

    /// Handle over an input-less child (future, activity).
    pub(crate) fn passive(id: impl Into<String>, stop: Option<DisposeHandle>) -> Self {
        Self {
            id: id.into(),
            sender: None,
            stop: Mutex::new(stop),
        }
    }

    /// Handle over a callback child dispatching to its registered listener.
    pub(crate) fn with_listener(
        id: impl Into<String>,
        slot: Arc<Mutex<Option<ChildListener>>>,
        stop: Option<DisposeHandle>,
    ) -> Self {
        Self {
            id: id.into(),
            sender: Some(ActorSender::Listener(slot)),
            stop: Mutex::new(stop),
        }
    }

    /// The id this child is registered under.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether events sent to this child can reach it.
    pub fn can_receive(&self) -> bool {
        self.sender.is_some()
    }

    /// Delivers an event to the child. Passive children drop it.
    pub fn send(&self, event: &Event) -> Result<(), InterpreterError> {
        match &self.sender {
            Some(ActorSender::Service(service)) => service.send(event.clone()).map(|_| ()),
            Some(ActorSender::Listener(slot)) => {
                // Take the listener out for the call so it may itself
                // re-register (or send back) without deadlocking.
                let listener = slot.lock().take();
                if let Some(listener) = listener {
                    listener(event);
                    let mut guard = slot.lock();
                    if guard.is_none() {
                        *guard = Some(listener);
                    }
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Runs the child's teardown. Only the first call has an effect.
    pub fn stop(&self) {
        if let Some(stop) = self.stop.lock().take() {
            stop();
        }
    }
}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("id", &self.id)
            .field("can_receive", &self.can_receive())
            .finish_non_exhaustive()
    }
}
