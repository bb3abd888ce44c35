//! # Interpreter configuration.
//!
//! Provides [`InterpreterOptions`], the per-service settings merged with
//! defaults at construction.
//!
//! Options are used in two ways:
//! 1. **Service creation**: `Interpreter::new(machine, options)`
//! 2. **Child inheritance**: a spawned child machine inherits its parent's
//!    runtime options (clock, logger, execute/defer flags) with its own
//!    identifier.
//!
//! ## Field semantics
//! - `execute = false` → actions are never run; the service acts as a pure
//!   state reducer with observers
//! - `defer_events = false` → sending before `start` is an error instead
//!   of queueing
//! - `bus_capacity` → notification ring buffer size (min 1; clamped)

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::devtools::DevTools;
use crate::logger::{ConsoleLogger, Logger};

/// Per-service configuration for the interpreter runtime.
///
/// All fields are public for flexibility; the `with_*` helpers exist for
/// call-site ergonomics when only one or two fields change.
#[derive(Clone)]
pub struct InterpreterOptions {
    /// Whether the interpreter executes the actions attached to each state.
    ///
    /// With `false` the service still transitions and notifies observers,
    /// but produces no side effects: no sends, no timers, no children.
    pub execute: bool,

    /// Whether events sent before `start` are queued until the service
    /// starts (`true`) or rejected with
    /// [`InterpreterError::NotStarted`](crate::InterpreterError) (`false`).
    pub defer_events: bool,

    /// Timer source for delayed sends.
    ///
    /// Defaults to [`SystemClock`] (host timers). Tests substitute
    /// [`SimulatedClock`](crate::SimulatedClock) for deterministic time.
    pub clock: Arc<dyn Clock>,

    /// Sink for `log` actions. Defaults to [`ConsoleLogger`].
    pub logger: Arc<dyn Logger>,

    /// Optional inspector attached at start.
    pub dev_tools: Option<Arc<dyn DevTools>>,

    /// Override for the service identifier (defaults to the machine id).
    pub id: Option<String>,

    /// Capacity of the lifecycle notification ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages
    /// skip older notifications. Minimum value is 1 (enforced by the bus).
    pub bus_capacity: usize,
}

impl InterpreterOptions {
    /// Replaces the clock capability.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the logger capability.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Attaches a developer-tools adapter.
    #[must_use]
    pub fn with_dev_tools(mut self, dev_tools: Arc<dyn DevTools>) -> Self {
        self.dev_tools = Some(dev_tools);
        self
    }

    /// Overrides the service identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Disables action execution (pure-reducer mode).
    #[must_use]
    pub fn without_execution(mut self) -> Self {
        self.execute = false;
        self
    }

    /// Rejects events sent before `start` instead of queueing them.
    #[must_use]
    pub fn without_deferral(mut self) -> Self {
        self.defer_events = false;
        self
    }

    /// Returns the bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for InterpreterOptions {
    /// Default configuration:
    ///
    /// - `execute = true`
    /// - `defer_events = true`
    /// - `clock = SystemClock` (host timers)
    /// - `logger = ConsoleLogger`
    /// - `dev_tools = None`
    /// - `id = None` (machine id)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            execute: true,
            defer_events: true,
            clock: Arc::new(SystemClock::new()),
            logger: Arc::new(ConsoleLogger),
            dev_tools: None,
            id: None,
            bus_capacity: 1024,
        }
    }
}
