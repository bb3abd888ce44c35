//! # Action executor.
//!
//! Walks the ordered action list attached to a state and performs each
//! effect, bound to the (context, event) pair of the state that carries
//! it.
//!
//! ## Dispatch
//! ```text
//! Send    ─► delayed?  ─► resolve delay ─► arm timer (fires through send/send_to)
//!         ─► targeted? ─► route to parent / named child
//!         ─► otherwise ─► self-send (queued behind the current transition)
//! Cancel  ─► revoke the delayed send armed under the send-id
//! Start   ─► invoke: dispatch on the factory's InvokeSource shape
//!         ─► plain activity: resolve implementation, keep dispose handle
//! Stop    ─► stop and deregister the child under the activity id
//! Log     ─► evaluate the expression, hand the value to the logger
//! Custom  ─► run the attached executor; warn-and-skip when absent
//! ```

use std::time::Duration;

use serde_json::json;

use super::interpreter::{Interpreter, SpawnOptions};
use super::registry::{send_to, spawn_activity, spawn_callback, spawn_child_service, spawn_future};
use super::timers::resolve_delay;
use crate::actions::{Action, ActionMeta, ActivityDef, SendAction};
use crate::actors::InvokeSource;
use crate::clock::TimerCallback;
use crate::diag::dev_warn;
use crate::error::InterpreterError;
use crate::events::{Notification, NotificationKind};
use crate::machine::State;

/// Executes one action against the state that carries it.
pub(crate) fn execute_action(
    service: &Interpreter,
    state: &State,
    action: &Action,
) -> Result<(), InterpreterError> {
    match action {
        // Marker for the first update; nothing to execute.
        Action::Init => Ok(()),
        Action::Send(send) => execute_send(service, state, send),
        Action::Cancel { send_id } => {
            service.timers().cancel(send_id);
            service.publish(
                Notification::now(NotificationKind::DelayedSendCancelled)
                    .with_service(service.id())
                    .with_send_id(send_id.clone()),
            );
            Ok(())
        }
        Action::Start { activity } => execute_start(service, state, activity),
        Action::StopActivity { activity } => {
            if service.registry().stop_child(&activity.id) {
                service.publish(
                    Notification::now(NotificationKind::ChildStopped)
                        .with_service(service.id())
                        .with_child(activity.id.clone()),
                );
            }
            Ok(())
        }
        Action::Log { label, expr } => {
            let value = match expr {
                Some(expr) => expr(&state.context, &state.event),
                None => json!({
                    "context": state.context,
                    "event": { "name": state.event.name, "data": state.event.data },
                }),
            };
            service.logger().log(label.as_deref(), value);
            Ok(())
        }
        Action::Custom(custom) => {
            match &custom.exec {
                Some(exec) => exec(&state.context, &state.event, ActionMeta { action, state }),
                None => {
                    dev_warn!(
                        "no executor found for action \"{}\" on service \"{}\"",
                        custom.name,
                        service.id()
                    );
                }
            }
            Ok(())
        }
    }
}

fn execute_send(
    service: &Interpreter,
    state: &State,
    send: &SendAction,
) -> Result<(), InterpreterError> {
    if let Some(delay_spec) = &send.delay {
        let Some(ms) = resolve_delay(
            service.machine().options(),
            delay_spec,
            &state.context,
            &state.event,
        ) else {
            // Unresolvable named delay: the send is dropped.
            return Ok(());
        };
        defer_send(service, send.clone(), Duration::from_millis(ms));
        return Ok(());
    }

    match &send.to {
        Some(target) => send_to(service, &send.event, target),
        None => service.send(send.event.clone()).map(|_| ()),
    }
}

/// Arms a cancellable timer that performs the send when it fires. The
/// callback holds the service weakly: a dropped service silences its
/// outstanding timers.
fn defer_send(service: &Interpreter, send: SendAction, delay: Duration) {
    let key = send.id.clone();
    let armed_id = send.id.clone();
    let weak = service.downgrade();

    let callback: TimerCallback = Box::new(move || {
        let Some(service) = weak.upgrade() else { return };
        service.timers().complete(&send.id);
        let result = match &send.to {
            Some(target) => send_to(&service, &send.event, target),
            None => service.send(send.event.clone()).map(|_| ()),
        };
        if let Err(err) = result {
            dev_warn!("delayed send \"{}\" failed: {err}", send.id);
        }
    });

    service.timers().arm(&key, delay, callback);
    service.publish(
        Notification::now(NotificationKind::DelayedSendArmed)
            .with_service(service.id())
            .with_send_id(armed_id)
            .with_delay(delay),
    );
}

fn execute_start(
    service: &Interpreter,
    state: &State,
    activity: &ActivityDef,
) -> Result<(), InterpreterError> {
    // A transient state may start and stop an activity within one step;
    // only start what the entered state actually marks active.
    if !state.activity_active(&activity.id) {
        return Ok(());
    }

    if !activity.is_invoke() {
        spawn_activity(service, &state.context, activity);
        return Ok(());
    }

    let Some(src) = activity.src.as_deref() else {
        dev_warn!(
            "invoke \"{}\" on service \"{}\" has no source",
            activity.id,
            service.id()
        );
        return Ok(());
    };
    let Some(factory) = service.machine().options().services.get(src).cloned() else {
        dev_warn!(
            "no service \"{src}\" registered on machine \"{}\"",
            service.machine().id()
        );
        return Ok(());
    };

    match factory(&state.context, &state.event) {
        InvokeSource::Future(future) => {
            spawn_future(service, &activity.id, future);
        }
        InvokeSource::Callback(callback) => {
            spawn_callback(service, &activity.id, callback);
        }
        InvokeSource::Machine(machine) => {
            let context = activity
                .data
                .as_ref()
                .map(|mapper| mapper(&state.context, &state.event));
            spawn_child_service(
                service,
                machine,
                SpawnOptions {
                    id: Some(activity.id.clone()),
                    auto_forward: activity.forward,
                    subscribe: false,
                    context,
                },
            )?;
        }
        // Reserved for named sources; accepted and ignored.
        InvokeSource::Name(_) => {}
    }
    Ok(())
}
