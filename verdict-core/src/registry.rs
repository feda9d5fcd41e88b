//! The test registry: owns cases, drives rounds, and fans events out to receivers.

use std::cell::{Cell, RefCell};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::rc::Rc;

use chrono::Local;

use crate::case::{CaseName, TestCase, Totals};
use crate::error::Error;
use crate::options::{FatalAction, OutputOptions, RegistryConfig};
use crate::outcome::{Severity, TestResult};
use crate::output::{HtmlReceiver, JunitReceiver, TextReceiver, XmlReceiver};
use crate::receiver::{
    ReceiverResult, ResultLine, ResultReceiver, SharedReceiver, Site, receiver_addr,
};
use crate::round::{self, RoundStart};
use crate::trace_categories;

/// Panic payload used by [`FatalAction::Panic`] once a required assertion fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FatalFailure {
    /// Name of the case holding the failed requirement.
    pub case: String,
}

impl std::fmt::Display for FatalFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a required test failed in '{}'", self.case)
    }
}

#[derive(Default)]
struct RoundState {
    cases: Vec<TestCase>,
    /// Start of the current round, or of the last completed one.
    round: Option<RoundStart>,
    round_open: bool,
    rounds_completed: usize,
}

/// Marks the registry as broadcasting for as long as it lives.
struct BroadcastGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> BroadcastGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self { flag })
        }
    }
}

impl Drop for BroadcastGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Aggregates test results and broadcasts them to receivers.
///
/// All methods take `&self`; a registry is meant to be created once at the start
/// of a test program and passed by reference to the code under test. Receivers may
/// hold a reference back to the registry, but any attempt to add or remove
/// receivers, create cases, or record results while a broadcast is in progress is
/// rejected or ignored.
///
/// # Lifecycle
///
/// Each round begins with the first recorded event and ends with
/// [`flush_summary`](Self::flush_summary), after which all cases are cleared.
/// Dropping the registry (or calling [`finish`](Self::finish)) flushes the summary
/// and gives every remaining receiver a final teardown call.
pub struct TestRegistry {
    config: RegistryConfig,
    state: RefCell<RoundState>,
    receivers: RefCell<Vec<SharedReceiver>>,
    broadcasting: Cell<bool>,
    torn_down: Cell<bool>,
    fatal_seen: Cell<bool>,
}

impl TestRegistry {
    /// Creates a registry, registering the built-in receivers the configuration asks for.
    pub fn new(config: RegistryConfig) -> Self {
        let options = config.options;
        let mut receivers: Vec<SharedReceiver> = vec![];

        if config.text_path.is_some()
            || options.contains(OutputOptions::SEND_TO_STDOUT)
            || options.contains(OutputOptions::SEND_TO_STDERR)
        {
            receivers.push(Rc::new(RefCell::new(TextReceiver::new(
                config.text_path.clone(),
                options,
            ))));
        }
        if let Some(partial) = &config.html_path {
            receivers.push(Rc::new(RefCell::new(HtmlReceiver::new(
                partial.clone(),
                options,
            ))));
        }
        if let Some(partial) = &config.xml_path {
            receivers.push(Rc::new(RefCell::new(XmlReceiver::new(partial.clone()))));
        }
        if let Some(partial) = &config.junit_path {
            receivers.push(Rc::new(RefCell::new(JunitReceiver::new(partial.clone()))));
        }

        tracing::debug!(
            target: trace_categories::REGISTRY,
            "created registry '{}' with {} built-in receiver(s)",
            config.name,
            receivers.len()
        );

        Self {
            config,
            state: RefCell::new(RoundState::default()),
            receivers: RefCell::new(receivers),
            broadcasting: Cell::new(false),
            torn_down: Cell::new(false),
            fatal_seen: Cell::new(false),
        }
    }

    /// Name of the test run.
    pub fn name(&self) -> &str {
        self.config.name.as_str()
    }

    /// The configuration the registry was created with.
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Output options in effect.
    pub const fn options(&self) -> OutputOptions {
        self.config.options
    }

    /// Returns true if every flag in `options` is enabled.
    pub const fn does_output_option(&self, options: OutputOptions) -> bool {
        self.config.options.contains(options)
    }

    /// True while receivers are being called.
    pub fn is_broadcasting(&self) -> bool {
        self.broadcasting.get()
    }

    /// Number of receivers still subscribed, built-in ones included.
    pub fn receiver_count(&self) -> usize {
        self.receivers.borrow().len()
    }

    /// Number of summaries flushed so far.
    pub fn rounds_completed(&self) -> usize {
        self.state.borrow().rounds_completed
    }

    /// True if text output goes to standard output.
    pub const fn sends_to_stdout(&self) -> bool {
        self.does_output_option(OutputOptions::SEND_TO_STDOUT)
    }

    /// True if text output goes to standard error.
    pub const fn sends_to_stderr(&self) -> bool {
        self.does_output_option(OutputOptions::SEND_TO_STDERR)
    }

    /// Text file of the current (or most recent) round.
    pub fn text_file_name(&self) -> Option<PathBuf> {
        self.round_file_name(self.config.text_path.as_ref(), ".txt")
    }

    /// HTML page of the current (or most recent) round.
    pub fn html_file_name(&self) -> Option<PathBuf> {
        self.round_file_name(self.config.html_path.as_ref(), ".html")
    }

    /// HTML page holding the history of all rounds.
    pub fn main_html_file_name(&self) -> Option<PathBuf> {
        self.config
            .html_path
            .as_deref()
            .map(round::main_page_path)
    }

    /// XML file of the current (or most recent) round.
    pub fn xml_file_name(&self) -> Option<PathBuf> {
        self.round_file_name(self.config.xml_path.as_ref(), ".xml")
    }

    /// JUnit XML file of the current (or most recent) round.
    pub fn junit_file_name(&self) -> Option<PathBuf> {
        self.round_file_name(self.config.junit_path.as_ref(), ".junit.xml")
    }

    fn round_file_name(&self, partial: Option<&PathBuf>, extension: &str) -> Option<PathBuf> {
        let partial = partial?;
        let state = self.state.borrow();
        state
            .round
            .as_ref()
            .map(|round| round.file_name(partial, extension))
    }

    /// Looks up a case by name, creating it if it doesn't exist yet.
    ///
    /// Names longer than [`MAX_CASE_NAME_CHARS`](crate::MAX_CASE_NAME_CHARS) are
    /// truncated before lookup. New cases get the next 1-based index.
    pub fn get_or_create(&self, name: &str) -> Result<CaseHandle<'_>, Error> {
        let name = CaseName::new(name)?;
        if self.is_broadcasting() {
            return Err(Error::Busy);
        }

        self.ensure_case(&name);
        Ok(CaseHandle {
            registry: self,
            name,
        })
    }

    fn ensure_case(&self, name: &CaseName) {
        let mut state = self.state.borrow_mut();
        if state.cases.iter().any(|c| c.name() == name) {
            return;
        }

        let index = state.cases.len() + 1;
        tracing::debug!(
            target: trace_categories::REGISTRY,
            "registering case #{index} '{name}'"
        );
        state.cases.push(TestCase::new(name.clone(), index));
    }

    /// Snapshot of a case in the current round.
    pub fn case(&self, name: &str) -> Option<TestCase> {
        let name = CaseName::new(name).ok()?;
        self.state
            .borrow()
            .cases
            .iter()
            .find(|c| c.name() == &name)
            .cloned()
    }

    /// Snapshot of the case with the given 1-based index.
    pub fn case_at(&self, index: usize) -> Option<TestCase> {
        let position = index.checked_sub(1)?;
        self.state.borrow().cases.get(position).cloned()
    }

    /// Number of cases in the current round.
    pub fn case_count(&self) -> usize {
        self.state.borrow().cases.len()
    }

    /// Snapshots of all cases in the current round, in index order.
    pub fn cases(&self) -> Vec<TestCase> {
        self.state.borrow().cases.clone()
    }

    /// Item totals of the current round.
    pub fn item_totals(&self) -> Totals {
        Totals::items_of(&self.state.borrow().cases)
    }

    /// Case totals of the current round.
    pub fn case_totals(&self) -> Totals {
        Totals::cases_of(&self.state.borrow().cases)
    }

    /// Subscribes a receiver. Adding one that's already subscribed is a no-op.
    pub fn add_receiver(&self, receiver: SharedReceiver) -> Result<(), Error> {
        if self.is_broadcasting() {
            return Err(Error::Busy);
        }

        let mut receivers = self.receivers.borrow_mut();
        let addr = receiver_addr(&receiver);
        if !receivers.iter().any(|r| receiver_addr(r) == addr) {
            receivers.push(receiver);
        }

        Ok(())
    }

    /// Unsubscribes a receiver.
    pub fn remove_receiver<R: ResultReceiver + ?Sized + 'static>(
        &self,
        receiver: &Rc<RefCell<R>>,
    ) -> Result<(), Error> {
        if self.is_broadcasting() {
            return Err(Error::Busy);
        }

        let mut receivers = self.receivers.borrow_mut();
        let addr = receiver_addr(receiver);
        let position = receivers
            .iter()
            .position(|r| receiver_addr(r) == addr)
            .ok_or(Error::ReceiverNotRegistered)?;
        receivers.remove(position);

        Ok(())
    }

    /// Ends the current round: optional timestamps and summary table, then all
    /// cases are cleared.
    ///
    /// Does nothing if the round has no cases and a summary was already flushed
    /// before, or if called while broadcasting.
    pub fn flush_summary(&self) {
        if self.is_broadcasting() {
            tracing::warn!(
                target: trace_categories::REGISTRY,
                "ignoring summary flush requested while broadcasting"
            );
            return;
        }

        {
            let state = self.state.borrow();
            if state.cases.is_empty() && state.rounds_completed > 0 {
                return;
            }
        }

        self.start_round();

        let Some(guard) = BroadcastGuard::acquire(&self.broadcasting) else {
            return;
        };

        let (started, cases) = {
            let state = self.state.borrow();
            (state.round.clone(), state.cases.clone())
        };

        if self.does_output_option(OutputOptions::TIMESTAMP) {
            let full_day_name = self.does_output_option(OutputOptions::FULL_DAY_NAME);
            let start = started
                .as_ref()
                .map_or_else(String::new, RoundStart::timestamp);
            let stop = round::format_timestamp(&Local::now(), full_day_name);
            self.broadcast(&guard, "timestamp", |r| {
                if !r.on_timestamp(true, &start)? {
                    return Ok(false);
                }
                r.on_timestamp(false, &stop)
            });
        }

        if self.does_output_option(OutputOptions::SUMMARY_TABLE) {
            self.broadcast(&guard, "summary start", |r| r.on_summary_start());
            for case in &cases {
                self.broadcast(&guard, "table row", |r| r.on_table_row(case));
            }

            let items = Totals::items_of(&cases);
            let case_totals = Totals::cases_of(&cases);
            self.broadcast(&guard, "totals line", |r| r.on_totals_line(&items));
            self.broadcast(&guard, "summary line", |r| r.on_summary_line(&case_totals));
            self.broadcast(&guard, "summary end", |r| r.on_summary_end());
        }

        drop(guard);

        let mut state = self.state.borrow_mut();
        state.cases.clear();
        state.round_open = false;
        state.rounds_completed += 1;

        tracing::debug!(
            target: trace_categories::REGISTRY,
            "flushed summary for round {} of '{}' ({} case(s))",
            state.rounds_completed,
            self.config.name,
            cases.len()
        );
    }

    /// Flushes the summary and tears down all receivers.
    pub fn finish(self) {
        self.flush_summary();
        self.final_teardown();
    }

    fn start_round(&self) {
        if self.state.borrow().round_open {
            return;
        }

        let Some(guard) = BroadcastGuard::acquire(&self.broadcasting) else {
            return;
        };

        let round = RoundStart::new(
            self.config.name.clone(),
            Local::now(),
            self.does_output_option(OutputOptions::FULL_DAY_NAME),
        );

        {
            let mut state = self.state.borrow_mut();
            state.round = Some(round.clone());
            state.round_open = true;
        }

        tracing::debug!(
            target: trace_categories::REGISTRY,
            "starting round of '{}' at {}",
            self.config.name,
            round.timestamp()
        );

        self.broadcast(&guard, "start", |r| r.on_start(&round));
    }

    fn final_teardown(&self) {
        if self.torn_down.replace(true) {
            return;
        }

        let Some(_guard) = BroadcastGuard::acquire(&self.broadcasting) else {
            return;
        };

        let receivers = std::mem::take(&mut *self.receivers.borrow_mut());
        tracing::debug!(
            target: trace_categories::REGISTRY,
            "tearing down {} receiver(s)",
            receivers.len()
        );

        for receiver in receivers {
            let Ok(mut receiver) = receiver.try_borrow_mut() else {
                tracing::warn!(
                    target: trace_categories::BROADCAST,
                    "skipping teardown of a receiver that is already borrowed"
                );
                continue;
            };

            if let Err(payload) =
                std::panic::catch_unwind(AssertUnwindSafe(|| receiver.on_final_teardown()))
            {
                tracing::warn!(
                    target: trace_categories::BROADCAST,
                    "receiver panicked during teardown: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    /// Calls every subscribed receiver, dropping the ones that decline to continue.
    fn broadcast(
        &self,
        _guard: &BroadcastGuard<'_>,
        event: &'static str,
        mut call: impl FnMut(&mut dyn ResultReceiver) -> ReceiverResult,
    ) {
        let receivers = self.receivers.borrow().clone();
        let mut dropped = vec![];

        for receiver in &receivers {
            if !deliver(receiver, event, &mut call) {
                dropped.push(receiver_addr(receiver));
            }
        }

        if !dropped.is_empty() {
            self.receivers
                .borrow_mut()
                .retain(|r| !dropped.contains(&receiver_addr(r)));
        }
    }

    fn shows(&self, result: TestResult) -> bool {
        match result {
            TestResult::Passed => self.does_output_option(OutputOptions::PASSES),
            TestResult::Warning => self.does_output_option(OutputOptions::WARNINGS),
            TestResult::Failed | TestResult::Fatal | TestResult::Thrown => true,
        }
    }

    /// Marks the header of a case as emitted and returns a snapshot of the case,
    /// broadcasting the header first if this is its first output of the round.
    fn emit_header_if_needed(&self, guard: &BroadcastGuard<'_>, name: &CaseName) -> Option<TestCase> {
        let (case, first_output) = {
            let mut state = self.state.borrow_mut();
            let case = state.cases.iter_mut().find(|c| c.name() == name)?;
            let first_output = !case.header_emitted();
            case.mark_header_emitted();
            (case.clone(), first_output)
        };

        if first_output && self.does_output_option(OutputOptions::HEADERS) {
            self.broadcast(guard, "case header", |r| r.on_case_header(&case));
        }

        Some(case)
    }

    /// Applies `update` to the named case, (re-)creating it if the round was flushed.
    fn update_case(&self, name: &CaseName, update: impl FnOnce(&mut TestCase)) -> bool {
        self.ensure_case(name);
        let mut state = self.state.borrow_mut();
        match state.cases.iter_mut().find(|c| c.name() == name) {
            Some(case) => {
                update(case);
                true
            }
            None => false,
        }
    }

    fn record_result(
        &self,
        name: &CaseName,
        site: Site<'_>,
        severity: Severity,
        passed: bool,
        expression: &str,
        message: Option<&str>,
    ) -> bool {
        if self.is_broadcasting() || site.file.is_empty() || expression.is_empty() {
            return passed;
        }

        let result = TestResult::from_check(severity, passed);
        self.start_round();
        if !self.update_case(name, |case| case.tally(result)) {
            return passed;
        }

        if self.shows(result) {
            let line = ResultLine {
                result,
                site,
                expression,
                message: message.filter(|m| !m.is_empty()),
            };
            self.emit_line(name, &line);
        }

        if result.is_fatal() {
            self.run_fatal_path(name);
        }

        passed
    }

    fn record_exception(
        &self,
        name: &CaseName,
        site: Site<'_>,
        severity: Severity,
        expression: &str,
        message: Option<&str>,
    ) {
        if self.is_broadcasting() || site.file.is_empty() || expression.is_empty() {
            return;
        }

        let result = TestResult::from_panic(severity);
        self.start_round();
        if !self.update_case(name, TestCase::tally_exception) {
            return;
        }

        tracing::debug!(
            target: trace_categories::REGISTRY,
            "expression '{expression}' panicked in case '{name}'"
        );

        let line = ResultLine {
            result,
            site,
            expression,
            message: message.filter(|m| !m.is_empty()),
        };
        self.emit_line(name, &line);

        if result.is_fatal() {
            self.run_fatal_path(name);
        }
    }

    fn record_message(&self, name: &CaseName, site: Site<'_>, message: &str) {
        if self.is_broadcasting()
            || site.file.is_empty()
            || message.is_empty()
            || !self.does_output_option(OutputOptions::MESSAGES)
        {
            return;
        }

        self.start_round();
        self.ensure_case(name);

        let Some(guard) = BroadcastGuard::acquire(&self.broadcasting) else {
            return;
        };
        if let Some(case) = self.emit_header_if_needed(&guard, name) {
            self.broadcast(&guard, "message", |r| r.on_message(&case, &site, message));
        }
    }

    fn emit_line(&self, name: &CaseName, line: &ResultLine<'_>) {
        let Some(guard) = BroadcastGuard::acquire(&self.broadcasting) else {
            return;
        };
        if let Some(case) = self.emit_header_if_needed(&guard, name) {
            self.broadcast(&guard, "result line", |r| r.on_result_line(&case, line));
        }
    }

    fn run_fatal_path(&self, name: &CaseName) -> ! {
        let policy = self.config.fatal;
        self.fatal_seen.set(true);

        tracing::error!(
            target: trace_categories::REGISTRY,
            "required test failed in case '{name}'; unable to safely execute further tests"
        );

        if policy.flush_summary {
            self.flush_summary();
        }

        match policy.action {
            FatalAction::Exit(code) => {
                self.final_teardown();
                std::process::exit(code)
            }
            FatalAction::Panic => std::panic::panic_any(FatalFailure {
                case: name.as_str().to_owned(),
            }),
        }
    }
}

impl Drop for TestRegistry {
    fn drop(&mut self) {
        if self.torn_down.get() {
            return;
        }

        if std::thread::panicking() {
            tracing::debug!(
                target: trace_categories::REGISTRY,
                "registry dropped while unwinding; skipping summary and teardown"
            );
            return;
        }

        let skip_summary = self.fatal_seen.get() && !self.config.fatal.flush_summary;
        if self.config.summary_on_drop && !skip_summary {
            self.flush_summary();
        }

        self.final_teardown();
    }
}

/// A named case within a registry, used to record results.
///
/// The handle stays valid across rounds: after a summary flush, the next
/// recorded event re-creates the case under the same name.
#[derive(Clone)]
pub struct CaseHandle<'a> {
    registry: &'a TestRegistry,
    name: CaseName,
}

impl CaseHandle<'_> {
    /// Name of the case.
    pub const fn name(&self) -> &CaseName {
        &self.name
    }

    /// Records the outcome of an assertion and returns `passed`.
    ///
    /// A failed [`Severity::Require`] assertion runs the fatal path and doesn't return.
    pub fn record_result(
        &self,
        site: Site<'_>,
        severity: Severity,
        passed: bool,
        expression: &str,
        message: Option<&str>,
    ) -> bool {
        self.registry
            .record_result(&self.name, site, severity, passed, expression, message)
    }

    /// Records an assertion whose expression panicked.
    ///
    /// At [`Severity::Require`] this runs the fatal path and doesn't return.
    pub fn record_exception(
        &self,
        site: Site<'_>,
        severity: Severity,
        expression: &str,
        message: Option<&str>,
    ) {
        self.registry
            .record_exception(&self.name, site, severity, expression, message);
    }

    /// Records an informational message.
    pub fn record_message(&self, site: Site<'_>, message: &str) {
        self.registry.record_message(&self.name, site, message);
    }

    /// Current counters of the case, if it exists in the current round.
    pub fn snapshot(&self) -> Option<TestCase> {
        self.registry.case(self.name.as_str())
    }
}

fn deliver(
    receiver: &SharedReceiver,
    event: &'static str,
    call: &mut impl FnMut(&mut dyn ResultReceiver) -> ReceiverResult,
) -> bool {
    let Ok(mut borrowed) = receiver.try_borrow_mut() else {
        tracing::warn!(
            target: trace_categories::BROADCAST,
            "unsubscribing receiver that is already borrowed during {event}"
        );
        return false;
    };

    match std::panic::catch_unwind(AssertUnwindSafe(|| call(&mut *borrowed))) {
        Ok(Ok(true)) => true,
        Ok(Ok(false)) => {
            tracing::debug!(
                target: trace_categories::BROADCAST,
                "receiver unsubscribed during {event}"
            );
            false
        }
        Ok(Err(e)) => {
            tracing::warn!(
                target: trace_categories::BROADCAST,
                "unsubscribing receiver that failed during {event}: {e:#}"
            );
            false
        }
        Err(payload) => {
            tracing::warn!(
                target: trace_categories::BROADCAST,
                "unsubscribing receiver that panicked during {event}: {}",
                panic_message(payload.as_ref())
            );
            false
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(fatal) = payload.downcast_ref::<FatalFailure>() {
        fatal.to_string()
    } else {
        "unknown panic".to_owned()
    }
}
