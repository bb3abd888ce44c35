//! # Error types used by the statevisor runtime.
//!
//! This module defines two error enums:
//!
//! - [`InterpreterError`] errors raised by the interpreter runtime itself.
//! - [`ClockError`] errors raised by clock implementations.
//!
//! Both types provide an `as_label` helper for logs/metrics. Configuration
//! gaps (unknown delay names, missing service factories, missing activity
//! implementations) are deliberately **not** errors: they degrade to
//! debug-build warnings and no-ops, so a machine definition that is
//! ahead of its host wiring keeps running.

use serde_json::Value;
use thiserror::Error;

/// # Errors produced by the interpreter runtime.
///
/// These represent misuse of the service API or invocation failures the
/// bound machine declined to handle.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum InterpreterError {
    /// An event was sent to a service that has not been started, and the
    /// service was configured with `defer_events = false`.
    #[error("event \"{event}\" was sent to uninitialized service \"{service}\"; enable defer_events to queue events before start")]
    NotStarted {
        /// The service identifier.
        service: String,
        /// The rejected event name.
        event: String,
    },

    /// A send action addressed a child that does not exist (or was stopped).
    #[error("unable to send event to child \"{child}\" from service \"{service}\"; the child does not exist")]
    UnknownChild {
        /// The service identifier.
        service: String,
        /// The missing child identifier.
        child: String,
    },

    /// An auto-forward target vanished from the child registry. The forward
    /// set is kept as a subset of the registry, so this indicates internal
    /// state corruption rather than a caller mistake.
    #[error("unable to forward event to child \"{child}\" of service \"{service}\"; the child is missing from the registry")]
    ForwardTargetMissing {
        /// The service identifier.
        service: String,
        /// The missing child identifier.
        child: String,
    },

    /// An `error.execution` event reached a state that cannot handle it.
    /// The carried error data is surfaced to the caller instead of being
    /// silently swallowed by the transition.
    #[error("unhandled execution error in service \"{service}\": {data}")]
    UnhandledError {
        /// The service identifier.
        service: String,
        /// The error data carried by the rejected event.
        data: Value,
    },
}

impl InterpreterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            InterpreterError::NotStarted { .. } => "interpreter_not_started",
            InterpreterError::UnknownChild { .. } => "interpreter_unknown_child",
            InterpreterError::ForwardTargetMissing { .. } => "interpreter_forward_target_missing",
            InterpreterError::UnhandledError { .. } => "interpreter_unhandled_error",
        }
    }
}

/// # Errors produced by clock implementations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ClockError {
    /// The simulated clock was asked to move to an earlier instant.
    #[error("simulated clock cannot travel backwards ({from_ms}ms -> {to_ms}ms)")]
    BackwardTravel {
        /// Current simulated time, in milliseconds.
        from_ms: u64,
        /// Requested simulated time, in milliseconds.
        to_ms: u64,
    },
}

impl ClockError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            ClockError::BackwardTravel { .. } => "clock_backward_travel",
        }
    }
}
