//! # Actors: the uniform handle over every kind of child.
//!
//! Whatever a service supervises — a nested machine, a one-shot future,
//! a callback loop, a plain activity — the parent only ever holds an
//! [`ActorRef`]: something it can `send` events to (maybe) and `stop`
//! (at most once).
//!
//! | Child kind   | `send`                          | `stop`                    |
//! |--------------|---------------------------------|---------------------------|
//! | machine      | delivered to the child service  | stops the child service   |
//! | future       | dropped (futures take no input) | discards the settlement   |
//! | callback     | last registered listener        | cancel + returned cleanup |
//! | activity     | dropped                         | dispose handle            |
//!
//! [`InvokeSource`] is what a service factory produces; the supervisor
//! dispatches on its shape to pick the child kind.

mod actor;
mod source;

pub use actor::ActorRef;
pub use source::{
    BoxInvokeFuture, CallbackCleanup, CallbackFn, ChildListener, DisposeHandle, EventSender,
    InvokeSource,
};
