//! # Clock capability: the only time source in the runtime.
//!
//! Delayed sends never touch host timer APIs directly; they go through
//! the [`Clock`] trait so a service driven by a
//! [`SimulatedClock`](crate::SimulatedClock) is fully deterministic.
//!
//! - **[`SystemClock`]** — default implementation backed by tokio timers.
//! - **[`SimulatedClock`]** — manual time for tests: advance with
//!   `set`/`increment`, due timers fire synchronously in insertion order.
//!
//! ## Rules
//! - `set_timeout` hands ownership of the callback to the clock; it runs
//!   at most once.
//! - `clear_timeout` is idempotent and may race the firing; a timer that
//!   already ran is simply gone.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

mod simulated;
mod system;

pub use simulated::SimulatedClock;
pub use system::SystemClock;

/// Boxed callback invoked when a timer fires. Runs at most once.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Opaque token identifying one scheduled timeout.
///
/// Holds a monotonic id (per clock) and the cancellation token the owning
/// clock observes. Cloning the handle does not duplicate the timer.
#[derive(Clone, Debug)]
pub struct TimerHandle {
    id: u64,
    cancel: CancellationToken,
}

impl TimerHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id,
            cancel: CancellationToken::new(),
        }
    }

    /// The clock-local identifier of this timer.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Abstract timer source used for delayed events.
pub trait Clock: Send + Sync + 'static {
    /// Schedules `callback` to run once after `delay`.
    fn set_timeout(&self, callback: TimerCallback, delay: Duration) -> TimerHandle;

    /// Cancels a previously scheduled timeout. No-op if it already fired.
    fn clear_timeout(&self, timer: &TimerHandle);
}
