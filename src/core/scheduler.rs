//! # Run-to-completion scheduler.
//!
//! Serializes the work units of one service so a transition — including
//! its action execution and listener notifications — always finishes
//! before the next event is processed, even when an action or listener
//! reentrantly submits further events.
//!
//! ## Architecture
//! ```text
//! schedule(task)
//!   ├─► not initialized        → queue (runs at initialize)
//!   ├─► a task is running      → queue (runs when it returns)
//!   └─► idle                   → run now, then drain the queue FIFO
//! ```
//!
//! ## Rules
//! - Tasks run synchronously to completion; the internal lock is **never**
//!   held while a task runs, so tasks may schedule freely.
//! - A task returning an error aborts the drain: the queue is cleared and
//!   the error propagates to the outermost `initialize`/`schedule` call —
//!   the one the application actually invoked.
//! - Scheduling before `initialize` queues unconditionally; whether a
//!   pre-start submission is allowed is the interpreter's policy
//!   (`defer_events`), decided before the task reaches this queue.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::error::InterpreterError;

/// One unit of serialized work.
pub(crate) type SchedulerTask = Box<dyn FnOnce() -> Result<(), InterpreterError> + Send>;

#[derive(Default)]
struct SchedulerInner {
    initialized: bool,
    processing: bool,
    queue: VecDeque<SchedulerTask>,
}

/// FIFO task serializer enforcing run-to-completion.
#[derive(Default)]
pub(crate) struct Scheduler {
    inner: Mutex<SchedulerInner>,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether `initialize` has run.
    pub(crate) fn initialized(&self) -> bool {
        self.inner.lock().initialized
    }

    /// Activates the scheduler: runs `task` immediately, then drains
    /// everything queued before or during it.
    pub(crate) fn initialize(&self, task: SchedulerTask) -> Result<(), InterpreterError> {
        {
            let mut inner = self.inner.lock();
            inner.initialized = true;
            inner.processing = true;
        }
        self.run_to_completion(task)
    }

    /// Runs `task` now if the scheduler is idle, otherwise queues it
    /// behind the task currently executing.
    pub(crate) fn schedule(&self, task: SchedulerTask) -> Result<(), InterpreterError> {
        {
            let mut inner = self.inner.lock();
            if !inner.initialized || inner.processing {
                inner.queue.push_back(task);
                return Ok(());
            }
            inner.processing = true;
        }
        self.run_to_completion(task)
    }

    /// Discards everything still queued. Used on service stop; the
    /// scheduler itself stays usable.
    pub(crate) fn clear(&self) {
        self.inner.lock().queue.clear();
    }

    fn run_to_completion(&self, first: SchedulerTask) -> Result<(), InterpreterError> {
        let mut next = Some(first);
        while let Some(task) = next.take() {
            if let Err(err) = task() {
                let mut inner = self.inner.lock();
                inner.queue.clear();
                inner.processing = false;
                return Err(err);
            }
            let mut inner = self.inner.lock();
            next = inner.queue.pop_front();
            if next.is_none() {
                inner.processing = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde_json::Value;

    use super::*;

    fn push(log: &Arc<Mutex<Vec<&'static str>>>, entry: &'static str) -> SchedulerTask {
        let log = Arc::clone(log);
        Box::new(move || {
            log.lock().push(entry);
            Ok(())
        })
    }

    #[test]
    fn pre_initialize_tasks_run_at_initialize_in_fifo_order() {
        let scheduler = Scheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        scheduler.schedule(push(&log, "first")).unwrap();
        scheduler.schedule(push(&log, "second")).unwrap();
        assert!(log.lock().is_empty());

        scheduler.initialize(push(&log, "init")).unwrap();
        assert_eq!(*log.lock(), vec!["init", "first", "second"]);
    }

    #[test]
    fn reentrant_schedules_run_after_the_current_task() {
        let scheduler = Arc::new(Scheduler::new());
        scheduler.initialize(Box::new(|| Ok(()))).unwrap();

        let log = Arc::new(Mutex::new(Vec::new()));
        let inner_log = Arc::clone(&log);
        let inner_scheduler = Arc::clone(&scheduler);
        scheduler
            .schedule(Box::new(move || {
                inner_log.lock().push("outer:begin");
                inner_scheduler.schedule(push(&inner_log, "inner")).unwrap();
                inner_log.lock().push("outer:end");
                Ok(())
            }))
            .unwrap();

        assert_eq!(*log.lock(), vec!["outer:begin", "outer:end", "inner"]);
    }

    #[test]
    fn an_erring_task_clears_the_queue_and_propagates() {
        let scheduler = Arc::new(Scheduler::new());
        scheduler.initialize(Box::new(|| Ok(()))).unwrap();

        let log = Arc::new(Mutex::new(Vec::new()));
        let inner_log = Arc::clone(&log);
        let inner_scheduler = Arc::clone(&scheduler);
        let result = scheduler.schedule(Box::new(move || {
            inner_scheduler.schedule(push(&inner_log, "never")).unwrap();
            Err(InterpreterError::UnhandledError {
                service: "s".to_string(),
                data: Value::Null,
            })
        }));

        assert!(result.is_err());
        assert!(log.lock().is_empty());

        // The scheduler recovers: later tasks run normally.
        scheduler.schedule(push(&log, "after")).unwrap();
        assert_eq!(*log.lock(), vec!["after"]);
    }
}
