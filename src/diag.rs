//! # Development diagnostics.
//!
//! Configuration gaps (unknown delay names, missing service factories,
//! unknown action tags, sends to an absent parent) are warnings, not
//! errors: the interpreter keeps running and the warning is printed to
//! stderr **only in debug builds**. Release builds suppress them.
//!
//! The one diagnostic that survives release builds is
//! [`report_unhandled_on_invocation`]: an invoked child failed and the
//! machine has no transition for the resulting `error.execution` event,
//! which usually means a missing `on_error` handler in the machine
//! definition.

use serde_json::Value;

/// Prints a development-only warning to stderr.
///
/// Compiled to a no-op branch in release builds.
macro_rules! dev_warn {
    ($($arg:tt)*) => {
        if cfg!(debug_assertions) {
            eprintln!("[statevisor] warning: {}", format_args!($($arg)*));
        }
    };
}

pub(crate) use dev_warn;

/// Reports an invocation error that no state of the machine handles.
///
/// Logs the original error raised by the child and the error data the
/// rejected self-send surfaced, deduplicating when they are identical.
pub(crate) fn report_unhandled_on_invocation(original: &Value, current: &Value, child: &str) {
    if original == current {
        eprintln!("[statevisor] unhandled error during invocation of \"{child}\": {original}");
    } else {
        eprintln!(
            "[statevisor] unhandled error during invocation of \"{child}\": {original} (surfaced as: {current})"
        );
    }
}
