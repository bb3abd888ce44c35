//! # Delayed-event registry.
//!
//! Tracks the outstanding delayed sends of one service, keyed by send-id,
//! so a later `cancel` action (or service stop) can revoke them.
//!
//! ## Rules
//! - The map stays 1:1 with live clock timeouts: re-arming an id cancels
//!   the timer it replaces, and a fired timer removes its own entry
//!   (see `complete`) before delivering the send.
//! - `cancel` and `cancel_all` clear the clock timeout and the entry
//!   together.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;

use crate::actions::DelaySpec;
use crate::clock::{Clock, TimerCallback, TimerHandle};
use crate::diag::dev_warn;
use crate::machine::{Delay, Event, MachineOptions};

/// Send-id → live clock timeout.
pub(crate) struct TimerRegistry {
    clock: Arc<dyn Clock>,
    entries: DashMap<String, TimerHandle>,
}

impl TimerRegistry {
    pub(crate) fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: DashMap::new(),
        }
    }

    /// Schedules `callback` after `delay` under `send_id`, replacing (and
    /// cancelling) any timer already armed under that id.
    pub(crate) fn arm(&self, send_id: &str, delay: Duration, callback: TimerCallback) {
        let handle = self.clock.set_timeout(callback, delay);
        if let Some(previous) = self.entries.insert(send_id.to_string(), handle) {
            self.clock.clear_timeout(&previous);
        }
    }

    /// Drops the registry entry for a timer that just fired.
    pub(crate) fn complete(&self, send_id: &str) {
        self.entries.remove(send_id);
    }

    /// Cancels the delayed send armed under `send_id`, if any.
    pub(crate) fn cancel(&self, send_id: &str) {
        if let Some((_, handle)) = self.entries.remove(send_id) {
            self.clock.clear_timeout(&handle);
        }
    }

    /// Cancels every outstanding delayed send.
    pub(crate) fn cancel_all(&self) {
        let ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.cancel(&id);
        }
    }

    /// Number of outstanding delayed sends.
    pub(crate) fn outstanding(&self) -> usize {
        self.entries.len()
    }
}

/// Resolves a send action's delay to milliseconds.
///
/// A named delay missing from the machine's table resolves to `None`:
/// the send is dropped with a debug-build warning, nothing is scheduled
/// and nothing is raised.
pub(crate) fn resolve_delay(
    options: &MachineOptions,
    spec: &DelaySpec,
    context: &Value,
    event: &Event,
) -> Option<u64> {
    match spec {
        DelaySpec::Millis(ms) => Some(*ms),
        DelaySpec::Named(name) => match options.delays.get(name) {
            Some(Delay::Fixed(ms)) => Some(*ms),
            Some(Delay::Dynamic(compute)) => Some(compute(context, event)),
            None => {
                dev_warn!("no delay \"{name}\" found in the machine's delays table; dropping delayed send");
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::clock::SimulatedClock;

    fn counting_callback(counter: &Arc<AtomicUsize>) -> TimerCallback {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn rearming_a_send_id_replaces_the_previous_timer() {
        let clock = Arc::new(SimulatedClock::new());
        let registry = TimerRegistry::new(clock.clone());
        let fired = Arc::new(AtomicUsize::new(0));

        registry.arm("t1", Duration::from_millis(100), counting_callback(&fired));
        registry.arm("t1", Duration::from_millis(100), counting_callback(&fired));
        assert_eq!(registry.outstanding(), 1);
        assert_eq!(clock.pending(), 1);

        clock.increment(Duration::from_millis(100));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_clears_both_entry_and_timer() {
        let clock = Arc::new(SimulatedClock::new());
        let registry = TimerRegistry::new(clock.clone());
        let fired = Arc::new(AtomicUsize::new(0));

        registry.arm("t1", Duration::from_millis(100), counting_callback(&fired));
        registry.cancel("t1");
        assert_eq!(registry.outstanding(), 0);
        assert_eq!(clock.pending(), 0);

        clock.increment(Duration::from_millis(200));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_all_leaves_nothing_behind() {
        let clock = Arc::new(SimulatedClock::new());
        let registry = TimerRegistry::new(clock.clone());
        let fired = Arc::new(AtomicUsize::new(0));

        registry.arm("a", Duration::from_millis(10), counting_callback(&fired));
        registry.arm("b", Duration::from_millis(20), counting_callback(&fired));
        registry.cancel_all();

        assert_eq!(registry.outstanding(), 0);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn named_delays_resolve_through_the_table() {
        let options = MachineOptions::default()
            .with_delay("slow", Delay::Fixed(500))
            .with_delay(
                "from-context",
                Delay::Dynamic(Arc::new(|context, _| {
                    context["wait"].as_u64().unwrap_or(0)
                })),
            );
        let context = json!({ "wait": 250 });
        let event = Event::new("GO");

        assert_eq!(
            resolve_delay(&options, &DelaySpec::Millis(10), &context, &event),
            Some(10)
        );
        assert_eq!(
            resolve_delay(&options, &DelaySpec::Named("slow".into()), &context, &event),
            Some(500)
        );
        assert_eq!(
            resolve_delay(
                &options,
                &DelaySpec::Named("from-context".into()),
                &context,
                &event
            ),
            Some(250)
        );
        assert_eq!(
            resolve_delay(&options, &DelaySpec::Named("nope".into()), &context, &event),
            None
        );
    }
}
