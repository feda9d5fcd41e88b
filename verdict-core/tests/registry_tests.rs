//! Registry behavior as seen by receivers.

use std::cell::RefCell;
use std::panic::AssertUnwindSafe;
use std::rc::{Rc, Weak};

use anyhow::Result;
use pretty_assertions::assert_eq;
use verdict_core::{
    Error, FatalAction, FatalFailure, FatalPolicy, OutputOptions, ReceiverResult,
    RegistryConfig, ResultReceiver, RoundStart, Severity, Site, TestRegistry, Totals, share,
};

mod common;
use common::{Recorder, count, logged, recorded_registry};

const EVERYTHING: OutputOptions = OutputOptions::PASSES
    .with(OutputOptions::WARNINGS)
    .with(OutputOptions::HEADERS)
    .with(OutputOptions::MESSAGES)
    .with(OutputOptions::TIMESTAMP)
    .with(OutputOptions::SUMMARY_TABLE);

fn here(line: u32) -> Site<'static> {
    Site::new(file!(), line)
}

#[test]
fn cases_are_indexed_in_creation_order() -> Result<()> {
    let (registry, _events) = recorded_registry(OutputOptions::NOTHING);

    let a = registry.get_or_create("alpha")?;
    let b = registry.get_or_create("beta")?;
    let a_again = registry.get_or_create("alpha")?;

    assert_eq!(a.name(), a_again.name());
    assert_eq!(registry.case_count(), 2);
    assert_eq!(registry.case("alpha").map(|c| c.index()), Some(1));
    assert_eq!(registry.case(b.name().as_str()).map(|c| c.index()), Some(2));

    Ok(())
}

#[test]
fn long_names_share_a_case() -> Result<()> {
    let (registry, _events) = recorded_registry(OutputOptions::NOTHING);

    registry.get_or_create("a name that is far too long to keep")?;
    let other = registry.get_or_create("a name that is far too long anyway")?;

    assert_eq!(registry.case_count(), 1);
    assert_eq!(other.name().as_str(), "a name that is far too ");

    Ok(())
}

#[test]
fn empty_name_is_rejected() {
    let (registry, _events) = recorded_registry(OutputOptions::NOTHING);
    assert!(matches!(registry.get_or_create(""), Err(Error::EmptyName)));
    assert_eq!(registry.case_count(), 0);
}

#[test]
fn pass_and_fail_are_counted() -> Result<()> {
    let (registry, _events) = recorded_registry(OutputOptions::DEFAULT);
    let case = registry.get_or_create("A")?;

    assert!(case.record_result(here(line!()), Severity::Checked, true, "1 == 1", None));
    assert!(!case.record_result(here(line!()), Severity::Checked, false, "1 == 2", None));

    let snapshot = case.snapshot().expect("case should exist");
    assert_eq!(snapshot.items(), 2);
    assert_eq!(snapshot.passed(), 1);
    assert_eq!(snapshot.failed(), 1);
    assert!(!snapshot.did_pass());
    assert_eq!(snapshot.outcome_label(), "FAILED");

    Ok(())
}

#[test]
fn warnings_do_not_fail_a_case() -> Result<()> {
    let (registry, _events) = recorded_registry(OutputOptions::DEFAULT);
    let case = registry.get_or_create("lenient")?;

    assert!(!case.record_result(here(line!()), Severity::Warning, false, "soon()", None));

    let snapshot = case.snapshot().expect("case should exist");
    assert_eq!(snapshot.warned(), 1);
    assert!(snapshot.did_pass());

    Ok(())
}

#[test]
fn exceptions_are_counted_as_thrown() -> Result<()> {
    let (registry, events) = recorded_registry(OutputOptions::DEFAULT);
    let case = registry.get_or_create("explosive")?;

    case.record_exception(here(line!()), Severity::Checked, "detonate()", Some("boom"));

    let snapshot = case.snapshot().expect("case should exist");
    assert_eq!(snapshot.items(), 1);
    assert_eq!(snapshot.thrown(), 1);
    assert!(!snapshot.did_pass());
    assert!(logged(&events).contains(&"line explosive THROWN 1".to_owned()));

    Ok(())
}

#[test]
fn receivers_see_events_in_order() -> Result<()> {
    let (registry, events) = recorded_registry(EVERYTHING);

    let a = registry.get_or_create("A")?;
    let b = registry.get_or_create("B")?;
    a.record_result(here(line!()), Severity::Checked, true, "ok()", None);
    a.record_message(here(line!()), "hello");
    b.record_result(here(line!()), Severity::Checked, false, "broken()", None);
    registry.flush_summary();

    assert_eq!(
        logged(&events),
        vec![
            "start Recorded Tests",
            "header A #1",
            "line A Passed 1",
            "message A hello",
            "header B #2",
            "line B FAILED 1",
            "timestamp start",
            "timestamp stop",
            "summary-start",
            "row A 1/0/0/0/1",
            "row B 0/0/1/0/1",
            "totals 1/0/1/0/2",
            "summary-line 1/0/1/0/2",
            "summary-end",
        ]
    );

    drop(registry);
    assert_eq!(count(&events, "teardown"), 1);
    assert_eq!(count(&events, "summary-start"), 1);

    Ok(())
}

#[test]
fn hidden_results_still_count() -> Result<()> {
    let (registry, events) = recorded_registry(OutputOptions::HEADERS);
    let case = registry.get_or_create("quiet")?;

    case.record_result(here(line!()), Severity::Checked, true, "ok()", None);
    case.record_result(here(line!()), Severity::Warning, false, "meh()", None);
    case.record_message(here(line!()), "not shown");

    assert_eq!(logged(&events), vec!["start Recorded Tests"]);
    assert_eq!(case.snapshot().map(|c| c.items()), Some(2));

    case.record_result(here(line!()), Severity::Checked, false, "bad()", None);
    assert_eq!(
        logged(&events),
        vec!["start Recorded Tests", "header quiet #1", "line quiet FAILED 3"]
    );

    Ok(())
}

#[test]
fn header_is_emitted_once_per_round() -> Result<()> {
    let (registry, events) = recorded_registry(EVERYTHING);
    let case = registry.get_or_create("A")?;

    case.record_result(here(line!()), Severity::Checked, true, "one()", None);
    case.record_result(here(line!()), Severity::Checked, true, "two()", None);
    assert_eq!(count(&events, "header"), 1);

    registry.flush_summary();
    case.record_result(here(line!()), Severity::Checked, true, "three()", None);
    assert_eq!(count(&events, "header"), 2);
    assert_eq!(count(&events, "start"), 2);

    Ok(())
}

#[test]
fn flush_clears_cases_and_restarts_indexes() -> Result<()> {
    let (registry, _events) = recorded_registry(OutputOptions::NOTHING);

    let first = registry.get_or_create("first")?;
    registry.get_or_create("second")?;
    registry.flush_summary();

    assert_eq!(registry.case_count(), 0);
    assert_eq!(registry.rounds_completed(), 1);
    assert_eq!(registry.item_totals(), Totals::default());

    registry.get_or_create("third")?;
    assert_eq!(registry.case("third").map(|c| c.index()), Some(1));

    // Handles outlive the round; their case comes back under a new index.
    first.record_result(here(line!()), Severity::Checked, true, "again()", None);
    assert_eq!(first.snapshot().map(|c| (c.index(), c.items())), Some((2, 1)));

    Ok(())
}

#[test]
fn empty_flush_happens_once() {
    let (registry, events) = recorded_registry(EVERYTHING);

    registry.flush_summary();
    registry.flush_summary();

    assert_eq!(count(&events, "start"), 1);
    assert_eq!(count(&events, "summary-start"), 1);
    assert_eq!(registry.rounds_completed(), 1);
}

#[test]
fn declining_receiver_is_dropped() -> Result<()> {
    let registry = common::registry(EVERYTHING);
    let (mut quitter, quitter_events) = Recorder::new();
    quitter.stop_on = Some("header");
    let (stayer, stayer_events) = Recorder::new();
    registry.add_receiver(share(quitter))?;
    registry.add_receiver(share(stayer))?;

    let case = registry.get_or_create("A")?;
    case.record_result(here(line!()), Severity::Checked, true, "ok()", None);
    case.record_result(here(line!()), Severity::Checked, true, "ok()", None);

    assert_eq!(
        logged(&quitter_events),
        vec!["start Recorded Tests", "header A #1"]
    );
    assert_eq!(count(&stayer_events, "line"), 2);
    assert_eq!(registry.receiver_count(), 1);

    Ok(())
}

#[test]
fn failing_and_panicking_receivers_are_dropped() -> Result<()> {
    let registry = common::registry(EVERYTHING);
    let (mut failing, failing_events) = Recorder::new();
    failing.fail_on = Some("line");
    let (mut panicking, panicking_events) = Recorder::new();
    panicking.panic_on = Some("start");
    let (healthy, healthy_events) = Recorder::new();

    registry.add_receiver(share(failing))?;
    registry.add_receiver(share(panicking))?;
    registry.add_receiver(share(healthy))?;

    let case = registry.get_or_create("A")?;
    case.record_result(here(line!()), Severity::Checked, true, "ok()", None);
    case.record_result(here(line!()), Severity::Checked, true, "ok()", None);
    registry.flush_summary();

    assert_eq!(count(&failing_events, "line"), 1);
    assert_eq!(count(&failing_events, "summary-start"), 0);
    assert_eq!(logged(&panicking_events), vec!["start Recorded Tests"]);
    assert_eq!(count(&healthy_events, "line"), 2);
    assert_eq!(count(&healthy_events, "summary-end"), 1);
    assert_eq!(registry.receiver_count(), 1);

    Ok(())
}

#[test]
fn adding_twice_is_a_no_op() -> Result<()> {
    let registry = common::registry(OutputOptions::NOTHING);
    let (recorder, events) = Recorder::new();
    let recorder = share(recorder);

    registry.add_receiver(recorder.clone())?;
    registry.add_receiver(recorder.clone())?;
    assert_eq!(registry.receiver_count(), 1);

    registry.flush_summary();
    assert_eq!(count(&events, "start"), 1);

    registry.remove_receiver(&recorder)?;
    assert_eq!(registry.receiver_count(), 0);
    assert!(matches!(
        registry.remove_receiver(&recorder),
        Err(Error::ReceiverNotRegistered)
    ));

    Ok(())
}

/// Receiver that tries to change the registry from inside a broadcast.
struct Meddler {
    registry: Weak<TestRegistry>,
    victim: Rc<RefCell<Recorder>>,
    outcomes: Rc<RefCell<Vec<String>>>,
}

impl ResultReceiver for Meddler {
    fn on_start(&mut self, _round: &RoundStart) -> ReceiverResult {
        let Some(registry) = self.registry.upgrade() else {
            return Ok(true);
        };

        let mut outcomes = self.outcomes.borrow_mut();
        let added = registry.add_receiver(share(Recorder::default()));
        outcomes.push(format!("add busy: {}", matches!(added, Err(Error::Busy))));
        let removed = registry.remove_receiver(&self.victim);
        outcomes.push(format!("remove busy: {}", matches!(removed, Err(Error::Busy))));
        let created = registry.get_or_create("intruder");
        outcomes.push(format!("create busy: {}", matches!(created, Err(Error::Busy))));
        registry.flush_summary();

        Ok(true)
    }
}

#[test]
fn registry_cannot_change_during_broadcast() -> Result<()> {
    let registry = Rc::new(common::registry(OutputOptions::NOTHING));
    let (victim, victim_events) = Recorder::new();
    let victim = share(victim);
    let outcomes = Rc::new(RefCell::new(vec![]));

    registry.add_receiver(share(Meddler {
        registry: Rc::downgrade(&registry),
        victim: victim.clone(),
        outcomes: outcomes.clone(),
    }))?;
    registry.add_receiver(victim)?;

    let case = registry.get_or_create("A")?;
    case.record_result(here(line!()), Severity::Checked, true, "ok()", None);

    assert_eq!(
        outcomes.borrow().clone(),
        vec!["add busy: true", "remove busy: true", "create busy: true"]
    );
    assert!(!registry.is_broadcasting());
    assert_eq!(registry.receiver_count(), 2);
    assert_eq!(registry.case_count(), 1);
    assert_eq!(registry.rounds_completed(), 0);
    assert_eq!(count(&victim_events, "start"), 1);

    Ok(())
}

fn panicking_policy(flush_summary: bool) -> FatalPolicy {
    FatalPolicy {
        flush_summary,
        action: FatalAction::Panic,
    }
}

#[test]
fn failed_requirement_flushes_once_and_unwinds() -> Result<()> {
    let registry = TestRegistry::new(
        RegistryConfig::new("fatal")
            .with_options(OutputOptions::DEFAULT)
            .with_fatal_policy(panicking_policy(true)),
    );
    let (recorder, events) = Recorder::new();
    registry.add_receiver(share(recorder))?;

    let case = registry.get_or_create("critical")?;
    let payload = std::panic::catch_unwind(AssertUnwindSafe(|| {
        case.record_result(here(line!()), Severity::Require, false, "ready()", None);
    }))
    .expect_err("a failed requirement should unwind");

    let failure = payload
        .downcast_ref::<FatalFailure>()
        .expect("payload should be a FatalFailure");
    assert_eq!(failure.case, "critical");
    assert!(logged(&events).contains(&"line critical FATAL 1".to_owned()));
    assert!(logged(&events).contains(&"row critical 0/0/1/0/1".to_owned()));
    assert_eq!(count(&events, "summary-start"), 1);
    assert_eq!(registry.rounds_completed(), 1);

    drop(registry);
    assert_eq!(count(&events, "summary-start"), 1);
    assert_eq!(count(&events, "teardown"), 1);

    Ok(())
}

#[test]
fn fatal_exception_follows_the_same_path() -> Result<()> {
    let registry = TestRegistry::new(
        RegistryConfig::new("fatal")
            .with_options(OutputOptions::DEFAULT)
            .with_fatal_policy(panicking_policy(true)),
    );
    let (recorder, events) = Recorder::new();
    registry.add_receiver(share(recorder))?;

    let case = registry.get_or_create("critical")?;
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        case.record_exception(here(line!()), Severity::Require, "load()", Some("no file"));
    }));

    assert!(outcome.is_err());
    assert!(logged(&events).contains(&"row critical 0/0/0/1/1".to_owned()));
    assert_eq!(count(&events, "summary-end"), 1);

    Ok(())
}

#[test]
fn fatal_path_can_skip_the_summary() -> Result<()> {
    let registry = TestRegistry::new(
        RegistryConfig::new("fatal")
            .with_options(OutputOptions::DEFAULT)
            .with_fatal_policy(panicking_policy(false)),
    );
    let (recorder, events) = Recorder::new();
    registry.add_receiver(share(recorder))?;

    let case = registry.get_or_create("critical")?;
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        case.record_result(here(line!()), Severity::Require, false, "ready()", None);
    }));
    assert!(outcome.is_err());

    drop(registry);
    assert_eq!(count(&events, "summary-start"), 0);
    assert_eq!(count(&events, "teardown"), 1);

    Ok(())
}

#[test]
fn finish_flushes_and_tears_down_once() -> Result<()> {
    let (registry, events) = recorded_registry(OutputOptions::SUMMARY_TABLE);
    registry
        .get_or_create("A")?
        .record_result(here(line!()), Severity::Checked, true, "ok()", None);

    registry.finish();

    assert_eq!(count(&events, "summary-start"), 1);
    assert_eq!(count(&events, "teardown"), 1);
    assert_eq!(logged(&events).last().map(String::as_str), Some("teardown"));

    Ok(())
}

#[test]
fn drop_can_skip_the_summary() -> Result<()> {
    let registry = TestRegistry::new(
        RegistryConfig::new("no summary")
            .with_options(OutputOptions::SUMMARY_TABLE)
            .with_summary_on_drop(false),
    );
    let (recorder, events) = Recorder::new();
    registry.add_receiver(share(recorder))?;
    registry
        .get_or_create("A")?
        .record_result(here(line!()), Severity::Checked, true, "ok()", None);

    drop(registry);

    assert_eq!(count(&events, "summary-start"), 0);
    assert_eq!(count(&events, "teardown"), 1);

    Ok(())
}
