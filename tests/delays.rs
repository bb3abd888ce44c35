//! Integration tests for delayed sends: arming, cancellation, named and
//! dynamic delay resolution, all under the simulated clock.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use statevisor::{
    Action, Delay, Interpreter, InterpreterOptions, MachineOptions, SendAction, SimulatedClock,
};

use common::{MachineBuilder, StateSpec};

fn with_clock(clock: &Arc<SimulatedClock>) -> InterpreterOptions {
    InterpreterOptions::default().with_clock(clock.clone())
}

#[test]
fn delayed_send_fires_once_the_clock_reaches_the_deadline() {
    let clock = Arc::new(SimulatedClock::new());
    let machine = MachineBuilder::new("m")
        .initial("a")
        .state(
            "a",
            StateSpec::new()
                .entry(vec![Action::send(SendAction::new("TICK").after_millis(1000))])
                .on("TICK", "b"),
        )
        .state("b", StateSpec::new())
        .build();
    let service = Interpreter::new(machine, with_clock(&clock));
    service.start(None).unwrap();
    assert_eq!(service.outstanding_delays(), 1);

    clock.increment(Duration::from_millis(999));
    assert_eq!(service.state().value, "a".into());

    clock.increment(Duration::from_millis(1));
    assert_eq!(service.state().value, "b".into());
    assert_eq!(service.outstanding_delays(), 0);
    assert_eq!(clock.pending(), 0);
}

#[test]
fn exit_cancel_prevents_a_scheduled_timeout() {
    let clock = Arc::new(SimulatedClock::new());
    let machine = MachineBuilder::new("m")
        .initial("a")
        .state(
            "a",
            StateSpec::new()
                .entry(vec![Action::send(
                    SendAction::new("TIMEOUT").with_id("t1").after_millis(1000),
                )])
                .exit(vec![Action::cancel("t1")])
                .on("GO", "b")
                .on("TIMEOUT", "timed-out"),
        )
        .state("b", StateSpec::new().on("TIMEOUT", "timed-out"))
        .state("timed-out", StateSpec::new())
        .build();
    let service = Interpreter::new(machine, with_clock(&clock));
    service.start(None).unwrap();

    // Leave "a" immediately; the exit action cancels t1.
    service.send("GO").unwrap();
    assert_eq!(service.outstanding_delays(), 0);
    assert_eq!(clock.pending(), 0);

    clock.increment(Duration::from_millis(2000));
    assert_eq!(service.state().value, "b".into(), "TIMEOUT must never fire");
}

#[test]
fn named_delay_resolves_through_the_machine_table() {
    let clock = Arc::new(SimulatedClock::new());
    let machine = MachineBuilder::new("m")
        .initial("a")
        .options(MachineOptions::default().with_delay("slow", Delay::Fixed(500)))
        .state(
            "a",
            StateSpec::new()
                .entry(vec![Action::send(SendAction::new("TICK").after_named("slow"))])
                .on("TICK", "b"),
        )
        .state("b", StateSpec::new())
        .build();
    let service = Interpreter::new(machine, with_clock(&clock));
    service.start(None).unwrap();

    clock.increment(Duration::from_millis(499));
    assert_eq!(service.state().value, "a".into());
    clock.increment(Duration::from_millis(1));
    assert_eq!(service.state().value, "b".into());
}

#[test]
fn dynamic_delay_reads_context_and_event() {
    let clock = Arc::new(SimulatedClock::new());
    let machine = MachineBuilder::new("m")
        .initial("a")
        .context(json!({ "wait": 250 }))
        .options(MachineOptions::default().with_delay(
            "from-context",
            Delay::Dynamic(Arc::new(|context, _| context["wait"].as_u64().unwrap_or(0))),
        ))
        .state(
            "a",
            StateSpec::new()
                .entry(vec![Action::send(
                    SendAction::new("TICK").after_named("from-context"),
                )])
                .on("TICK", "b"),
        )
        .state("b", StateSpec::new())
        .build();
    let service = Interpreter::new(machine, with_clock(&clock));
    service.start(None).unwrap();

    clock.increment(Duration::from_millis(250));
    assert_eq!(service.state().value, "b".into());
}

#[test]
fn unknown_delay_name_drops_the_send_silently() {
    let clock = Arc::new(SimulatedClock::new());
    let machine = MachineBuilder::new("m")
        .initial("a")
        .state(
            "a",
            StateSpec::new()
                .entry(vec![Action::send(
                    SendAction::new("TICK").after_named("missing"),
                )])
                .on("TICK", "timed-out")
                .on("GO", "b"),
        )
        .state("b", StateSpec::new())
        .state("timed-out", StateSpec::new())
        .build();
    let service = Interpreter::new(machine, with_clock(&clock));
    service.start(None).unwrap();

    // Nothing armed, nothing thrown.
    assert_eq!(service.outstanding_delays(), 0);
    assert_eq!(clock.pending(), 0);

    clock.increment(Duration::from_millis(10_000));
    assert_eq!(service.state().value, "a".into());

    // The service stays fully responsive.
    service.send("GO").unwrap();
    assert_eq!(service.state().value, "b".into());
}

#[test]
fn zero_delay_fires_on_the_next_clock_flush() {
    let clock = Arc::new(SimulatedClock::new());
    let machine = MachineBuilder::new("m")
        .initial("a")
        .state(
            "a",
            StateSpec::new()
                .entry(vec![Action::send(SendAction::new("TICK").after_millis(0))])
                .on("TICK", "b"),
        )
        .state("b", StateSpec::new())
        .build();
    let service = Interpreter::new(machine, with_clock(&clock));
    service.start(None).unwrap();

    // Not delivered synchronously at arm time...
    assert_eq!(service.state().value, "a".into());
    // ...but on the very next flush, even with no time passing.
    clock.increment(Duration::ZERO);
    assert_eq!(service.state().value, "b".into());
}

#[test]
fn rearming_a_send_id_restarts_the_deadline() {
    let clock = Arc::new(SimulatedClock::new());
    let machine = MachineBuilder::new("m")
        .initial("a")
        .state(
            "a",
            StateSpec::new()
                .entry(vec![Action::send(
                    SendAction::new("TIMEOUT").with_id("t1").after_millis(1000),
                )])
                .on("RE", "a")
                .on("TIMEOUT", "timed-out"),
        )
        .state("timed-out", StateSpec::new())
        .build();
    let service = Interpreter::new(machine, with_clock(&clock));
    service.start(None).unwrap();

    clock.increment(Duration::from_millis(500));
    // Re-entering "a" re-arms t1; only one timer may remain.
    service.send("RE").unwrap();
    assert_eq!(service.outstanding_delays(), 1);
    assert_eq!(clock.pending(), 1);

    // The original deadline (t=1000) passes without firing.
    clock.increment(Duration::from_millis(500));
    assert_eq!(service.state().value, "a".into());

    // The restarted deadline (t=1500) fires.
    clock.increment(Duration::from_millis(500));
    assert_eq!(service.state().value, "timed-out".into());
}

#[test]
fn stop_cancels_every_outstanding_delayed_send() {
    let clock = Arc::new(SimulatedClock::new());
    let machine = MachineBuilder::new("m")
        .initial("a")
        .state(
            "a",
            StateSpec::new()
                .entry(vec![
                    Action::send(SendAction::new("T1").with_id("t1").after_millis(1000)),
                    Action::send(SendAction::new("T2").with_id("t2").after_millis(2000)),
                ])
                .on("T1", "b")
                .on("T2", "b"),
        )
        .state("b", StateSpec::new())
        .build();
    let service = Interpreter::new(machine, with_clock(&clock));
    service.start(None).unwrap();
    assert_eq!(service.outstanding_delays(), 2);

    service.stop();
    assert_eq!(service.outstanding_delays(), 0);
    assert_eq!(clock.pending(), 0);

    clock.increment(Duration::from_millis(5000));
    assert_eq!(service.state().value, "a".into(), "stopped service stays put");
}
