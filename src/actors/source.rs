//! # Invoke sources: what a service factory produces.
//!
//! The machine's `services` table maps a `src` name to a factory; calling
//! the factory with the invoking (context, event) yields an
//! [`InvokeSource`] describing the child to supervise.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::machine::{Event, Machine};

/// Boxed future supervised as a promise-like child.
///
/// Resolution becomes `done.invoke.<id>`, rejection becomes
/// `error.execution` — unless the child was cancelled first.
pub type BoxInvokeFuture = Pin<Box<dyn Future<Output = Result<Value, Value>> + Send + 'static>>;

/// Take-once teardown handle of a child (dispose function, callback
/// cleanup, service stop).
pub type DisposeHandle = Box<dyn FnOnce() + Send>;

/// Handed to a callback child for sending events *into* the parent.
pub type EventSender = Arc<dyn Fn(Event) + Send + Sync>;

/// Listener a callback child registers to receive events *from* the
/// parent. The most recently registered listener wins.
pub type ChildListener = Box<dyn Fn(&Event) + Send>;

/// What a callback child returns from its setup call.
pub enum CallbackCleanup {
    /// Nothing to tear down.
    Forget,
    /// Run this when the child is stopped.
    Stop(DisposeHandle),
    /// The callback is a long-running future; its rejection is treated
    /// like a promise-child failure. Resolution is ignored.
    Pending(BoxInvokeFuture),
}

/// Setup function of a callback child.
///
/// Invoked once with a sender into the parent and a registrar for the
/// parent-to-child listener; returns its cleanup.
pub type CallbackFn =
    Box<dyn FnOnce(EventSender, &mut dyn FnMut(ChildListener)) -> CallbackCleanup + Send>;

/// The source of an invocation, as produced by a service factory.
pub enum InvokeSource {
    /// Promise-like child yielding a single value.
    Future(BoxInvokeFuture),
    /// Callback-driven child.
    Callback(CallbackFn),
    /// Nested machine spawned as a child service.
    Machine(Arc<dyn Machine>),
    /// Reserved; accepted and ignored.
    Name(String),
}

impl InvokeSource {
    /// Boxes a future as a promise-like source.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, Value>> + Send + 'static,
    {
        InvokeSource::Future(Box::pin(future))
    }

    /// Wraps a callback setup function.
    pub fn from_callback<F>(callback: F) -> Self
    where
        F: FnOnce(EventSender, &mut dyn FnMut(ChildListener)) -> CallbackCleanup + Send + 'static,
    {
        InvokeSource::Callback(Box::new(callback))
    }
}

impl fmt::Debug for InvokeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeSource::Future(_) => f.write_str("Future(..)"),
            InvokeSource::Callback(_) => f.write_str("Callback(..)"),
            InvokeSource::Machine(machine) => {
                f.debug_tuple("Machine").field(&machine.id()).finish()
            }
            InvokeSource::Name(name) => f.debug_tuple("Name").field(name).finish(),
        }
    }
}
