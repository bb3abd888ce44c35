//! # Real-time clock backed by tokio timers.
//!
//! Each timeout is a spawned task racing `time::sleep` against the
//! handle's cancellation token; clearing a timeout cancels the token and
//! the task exits without running the callback.
//!
//! ## Rules
//! - `set_timeout` must be called from within a tokio runtime (it spawns).
//! - The spawned task owns the callback; dropping the [`SystemClock`]
//!   itself does not cancel outstanding timers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::{select, time};

use super::{Clock, TimerCallback, TimerHandle};

/// Host timer source (the default clock).
#[derive(Debug, Default)]
pub struct SystemClock {
    next_id: AtomicU64,
}

impl SystemClock {
    /// Creates a new system clock.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn set_timeout(&self, callback: TimerCallback, delay: Duration) -> TimerHandle {
        let handle = TimerHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let token = handle.token().clone();

        tokio::spawn(async move {
            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => callback(),
                _ = token.cancelled() => {}
            }
        });

        handle
    }

    fn clear_timeout(&self, timer: &TimerHandle) {
        timer.token().cancel();
    }
}
