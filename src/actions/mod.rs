//! # Actions: the side effects a state carries as data.
//!
//! A machine never performs effects itself; it attaches an ordered
//! [`Action`] list to each state and the interpreter's executor walks it.

mod action;

pub use action::{
    Action, ActionExec, ActionMeta, ActivityDef, ContextMapper, CustomAction, DelaySpec, LogExpr,
    SendAction, SendTarget, INVOKE_ACTIVITY_TYPE,
};
