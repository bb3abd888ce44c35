//! # Logging capability for `log` actions.
//!
//! [`Logger`] is the sink behind the machine's `log` actions. The default
//! [`ConsoleLogger`] prints human-readable lines to stdout for development
//! and demos; hosts replace it through
//! [`InterpreterOptions::logger`](crate::InterpreterOptions) to route log
//! actions into their own logging stack.
//!
//! ## Output format
//! ```text
//! [log] fetch-finished: {"attempts":2}
//! [log] {"context":{"count":3},"event":{"name":"INC","data":null}}
//! ```

use serde_json::Value;

/// Sink for `log` actions executed by the interpreter.
///
/// Called synchronously from action execution; implementations should be
/// cheap and must not block.
pub trait Logger: Send + Sync + 'static {
    /// Writes one log entry. `label` is present when the log action was
    /// defined with a label.
    fn log(&self, label: Option<&str>, value: Value);
}

/// Simple stdout logger.
///
/// Not intended for production use; implement [`Logger`] to integrate
/// with a real logging stack.
#[derive(Debug, Default)]
pub struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, label: Option<&str>, value: Value) {
        match label {
            Some(label) => println!("[log] {label}: {value}"),
            None => println!("[log] {value}"),
        }
    }
}
