//! Shared helpers for verdict-core integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use verdict_core::{
    OutputOptions, ReceiverResult, RegistryConfig, ResultLine, ResultReceiver, RoundStart,
    Site, TestCase, TestRegistry, Totals,
};

/// Event log shared between a [`Recorder`] and the test that owns it.
pub type EventLog = Rc<RefCell<Vec<String>>>;

/// Receiver that logs every call, and can be told to stop, fail, or panic on
/// a given kind of event.
#[derive(Default)]
pub struct Recorder {
    /// Every call, in order.
    pub events: EventLog,
    /// Return `Ok(false)` on this kind of event.
    pub stop_on: Option<&'static str>,
    /// Return an error on this kind of event.
    pub fail_on: Option<&'static str>,
    /// Panic on this kind of event.
    pub panic_on: Option<&'static str>,
}

impl Recorder {
    /// Creates a recorder and a handle to its log.
    pub fn new() -> (Self, EventLog) {
        let recorder = Self::default();
        let events = recorder.events.clone();
        (recorder, events)
    }

    fn log(&mut self, kind: &'static str, detail: String) -> ReceiverResult {
        let entry = if detail.is_empty() {
            kind.to_owned()
        } else {
            format!("{kind} {detail}")
        };
        self.events.borrow_mut().push(entry);

        if self.panic_on == Some(kind) {
            panic!("recorder asked to panic on {kind}");
        }
        if self.fail_on == Some(kind) {
            anyhow::bail!("recorder asked to fail on {kind}");
        }
        Ok(self.stop_on != Some(kind))
    }
}

fn totals_text(t: &Totals) -> String {
    format!("{}/{}/{}/{}/{}", t.passed, t.warned, t.failed, t.thrown, t.total)
}

impl ResultReceiver for Recorder {
    fn on_start(&mut self, round: &RoundStart) -> ReceiverResult {
        self.log("start", round.name().to_owned())
    }

    fn on_message(&mut self, case: &TestCase, _site: &Site<'_>, message: &str) -> ReceiverResult {
        self.log("message", format!("{} {message}", case.name()))
    }

    fn on_case_header(&mut self, case: &TestCase) -> ReceiverResult {
        self.log("header", format!("{} #{}", case.name(), case.index()))
    }

    fn on_result_line(&mut self, case: &TestCase, line: &ResultLine<'_>) -> ReceiverResult {
        self.log(
            "line",
            format!("{} {} {}", case.name(), line.result, case.items()),
        )
    }

    fn on_timestamp(&mut self, is_start: bool, _stamp: &str) -> ReceiverResult {
        self.log("timestamp", if is_start { "start" } else { "stop" }.to_owned())
    }

    fn on_summary_start(&mut self) -> ReceiverResult {
        self.log("summary-start", String::new())
    }

    fn on_table_row(&mut self, case: &TestCase) -> ReceiverResult {
        self.log("row", format!("{} {}", case.name(), totals_text(&case.totals())))
    }

    fn on_totals_line(&mut self, totals: &Totals) -> ReceiverResult {
        self.log("totals", totals_text(totals))
    }

    fn on_summary_line(&mut self, totals: &Totals) -> ReceiverResult {
        self.log("summary-line", totals_text(totals))
    }

    fn on_summary_end(&mut self) -> ReceiverResult {
        self.log("summary-end", String::new())
    }

    fn on_final_teardown(&mut self) {
        self.events.borrow_mut().push("teardown".to_owned());
    }
}

/// Registry without built-in receivers.
pub fn registry(options: OutputOptions) -> TestRegistry {
    TestRegistry::new(RegistryConfig::new("Recorded Tests").with_options(options))
}

/// Registry without built-in receivers, plus a subscribed [`Recorder`].
pub fn recorded_registry(options: OutputOptions) -> (TestRegistry, EventLog) {
    let registry = registry(options);
    let (recorder, events) = Recorder::new();
    registry
        .add_receiver(Rc::new(RefCell::new(recorder)))
        .expect("registry should accept a receiver");
    (registry, events)
}

/// Events recorded so far, as plain strings.
pub fn logged(log: &EventLog) -> Vec<String> {
    log.borrow().clone()
}

/// Number of events whose kind is `kind`.
pub fn count(log: &EventLog, kind: &str) -> usize {
    log.borrow()
        .iter()
        .filter(|e| e.split(' ').next() == Some(kind))
        .count()
}
