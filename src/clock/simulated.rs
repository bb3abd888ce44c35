//! # Simulated clock for deterministic tests.
//!
//! Holds an integer "now" (milliseconds) and a list of pending timeouts.
//! Time only moves when the test says so:
//!
//! - [`SimulatedClock::set`] jumps to an absolute instant (backwards is an
//!   error),
//! - [`SimulatedClock::increment`] advances by a delta.
//!
//! Both flush afterwards: every pending timeout whose `start + timeout`
//! is within the new "now" fires **synchronously, in insertion order**,
//! then is removed. A callback that schedules a new timeout already due
//! fires within the same flush.
//!
//! ## Rules
//! - Setting the clock to its current instant is a no-op and never
//!   re-fires anything (fired entries are gone).
//! - Cancelled entries are skipped and pruned during the next flush.
//! - The lock is never held while a callback runs, so callbacks may
//!   schedule or cancel timers freely.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::{Clock, TimerCallback, TimerHandle};
use crate::error::ClockError;

struct SimTimer {
    handle: TimerHandle,
    start_ms: u64,
    timeout_ms: u64,
    callback: TimerCallback,
}

#[derive(Default)]
struct SimInner {
    now_ms: u64,
    timers: Vec<SimTimer>,
}

/// Deterministic manual-advance clock.
#[derive(Default)]
pub struct SimulatedClock {
    next_id: AtomicU64,
    inner: Mutex<SimInner>,
}

impl SimulatedClock {
    /// Creates a simulated clock starting at 0ms with no pending timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated instant.
    pub fn now(&self) -> Duration {
        Duration::from_millis(self.inner.lock().now_ms)
    }

    /// Number of pending (armed, not yet fired or cancelled) timeouts.
    pub fn pending(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.timers.retain(|t| !t.handle.is_cancelled());
        inner.timers.len()
    }

    /// Jumps to an absolute instant and fires every timeout now due.
    ///
    /// Returns [`ClockError::BackwardTravel`] if `at` is earlier than the
    /// current instant. Jumping to the current instant is a no-op.
    pub fn set(&self, at: Duration) -> Result<(), ClockError> {
        let to_ms = at.as_millis() as u64;
        {
            let mut inner = self.inner.lock();
            if to_ms < inner.now_ms {
                return Err(ClockError::BackwardTravel {
                    from_ms: inner.now_ms,
                    to_ms,
                });
            }
            inner.now_ms = to_ms;
        }
        self.flush();
        Ok(())
    }

    /// Advances by a delta and fires every timeout now due.
    pub fn increment(&self, by: Duration) {
        {
            let mut inner = self.inner.lock();
            inner.now_ms = inner.now_ms.saturating_add(by.as_millis() as u64);
        }
        self.flush();
    }

    /// Fires due timers one at a time, releasing the lock around each
    /// callback so reentrant `set_timeout`/`clear_timeout` calls work.
    fn flush(&self) {
        loop {
            let due = {
                let mut inner = self.inner.lock();
                inner.timers.retain(|t| !t.handle.is_cancelled());
                let now_ms = inner.now_ms;
                match inner
                    .timers
                    .iter()
                    .position(|t| t.start_ms + t.timeout_ms <= now_ms)
                {
                    Some(index) => inner.timers.remove(index),
                    None => break,
                }
            };
            (due.callback)();
        }
    }
}

impl Clock for SimulatedClock {
    fn set_timeout(&self, callback: TimerCallback, delay: Duration) -> TimerHandle {
        let handle = TimerHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut inner = self.inner.lock();
        let now_ms = inner.now_ms;
        inner.timers.push(SimTimer {
            handle: handle.clone(),
            start_ms: now_ms,
            timeout_ms: delay.as_millis() as u64,
            callback,
        });
        handle
    }

    fn clear_timeout(&self, timer: &TimerHandle) {
        timer.token().cancel();
        let mut inner = self.inner.lock();
        inner.timers.retain(|t| t.handle.id() != timer.id());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    fn record(log: &Arc<Mutex<Vec<&'static str>>>, entry: &'static str) -> TimerCallback {
        let log = Arc::clone(log);
        Box::new(move || log.lock().push(entry))
    }

    #[test]
    fn fires_due_timers_in_insertion_order() {
        let clock = SimulatedClock::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        clock.set_timeout(record(&log, "b"), Duration::from_millis(100));
        clock.set_timeout(record(&log, "a"), Duration::from_millis(50));

        clock.increment(Duration::from_millis(100));

        // Insertion order, not deadline order.
        assert_eq!(*log.lock(), vec!["b", "a"]);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn does_not_fire_before_deadline() {
        let clock = SimulatedClock::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        clock.set_timeout(
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            Duration::from_millis(500),
        );

        clock.increment(Duration::from_millis(499));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        clock.increment(Duration::from_millis(1));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn set_rejects_backward_travel() {
        let clock = SimulatedClock::new();
        clock.set(Duration::from_millis(1000)).unwrap();

        let err = clock.set(Duration::from_millis(500)).unwrap_err();
        assert_eq!(err.as_label(), "clock_backward_travel");

        // Same instant again is a no-op, not an error.
        clock.set(Duration::from_millis(1000)).unwrap();
    }

    #[test]
    fn set_to_same_instant_does_not_refire() {
        let clock = SimulatedClock::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        clock.set_timeout(
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            Duration::from_millis(100),
        );

        clock.set(Duration::from_millis(1000)).unwrap();
        clock.set(Duration::from_millis(1000)).unwrap();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cleared_timer_never_fires() {
        let clock = SimulatedClock::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let _keep = clock.set_timeout(record(&log, "keep"), Duration::from_millis(10));
        let cancelled = clock.set_timeout(record(&log, "cancelled"), Duration::from_millis(10));
        clock.clear_timeout(&cancelled);
        assert_eq!(clock.pending(), 1);

        clock.increment(Duration::from_millis(10));
        assert_eq!(*log.lock(), vec!["keep"]);
    }

    #[test]
    fn callback_may_arm_another_due_timer() {
        let clock = Arc::new(SimulatedClock::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner_log = Arc::clone(&log);
        let inner_clock = Arc::clone(&clock);
        clock.set_timeout(
            Box::new(move || {
                inner_log.lock().push("outer");
                let log = Arc::clone(&inner_log);
                inner_clock.set_timeout(Box::new(move || log.lock().push("inner")), Duration::ZERO);
            }),
            Duration::from_millis(5),
        );

        clock.increment(Duration::from_millis(5));
        assert_eq!(*log.lock(), vec!["outer", "inner"]);
    }
}
