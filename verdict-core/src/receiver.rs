//! The receiver side of the broadcast protocol.
//!
//! A registry calls its receivers in registration order, in this sequence:
//!
//! 1. [`on_start`](ResultReceiver::on_start) once per round, before anything else.
//! 2. Any interleaving of [`on_message`](ResultReceiver::on_message),
//!    [`on_case_header`](ResultReceiver::on_case_header), and
//!    [`on_result_line`](ResultReceiver::on_result_line).
//! 3. With timestamps enabled, two [`on_timestamp`](ResultReceiver::on_timestamp)
//!    calls: start, then stop.
//! 4. With the summary table enabled, [`on_summary_start`](ResultReceiver::on_summary_start),
//!    one [`on_table_row`](ResultReceiver::on_table_row) per case,
//!    [`on_totals_line`](ResultReceiver::on_totals_line),
//!    [`on_summary_line`](ResultReceiver::on_summary_line), and
//!    [`on_summary_end`](ResultReceiver::on_summary_end).
//! 5. [`on_final_teardown`](ResultReceiver::on_final_teardown) once, when the
//!    registry goes away.
//!
//! Returning `Ok(false)` or an error, or panicking, unsubscribes the receiver:
//! it won't be called again, not even for final teardown.

use std::cell::RefCell;
use std::rc::Rc;

use crate::case::{TestCase, Totals};
use crate::outcome::TestResult;
use crate::round::RoundStart;

/// Result of a receiver callback: `Ok(true)` to keep receiving events.
pub type ReceiverResult = anyhow::Result<bool>;

/// A receiver shared between its owner and a registry.
pub type SharedReceiver = Rc<RefCell<dyn ResultReceiver>>;

/// Source location of an assertion or message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Site<'a> {
    /// Source file.
    pub file: &'a str,
    /// 1-based line number.
    pub line: u32,
}

impl<'a> Site<'a> {
    /// Creates a site.
    pub const fn new(file: &'a str, line: u32) -> Self {
        Self { file, line }
    }
}

/// One recorded assertion, as broadcast to receivers.
#[derive(Clone, Copy, Debug)]
pub struct ResultLine<'a> {
    /// Outcome of the assertion.
    pub result: TestResult,
    /// Where the assertion is.
    pub site: Site<'a>,
    /// Source text of the asserted expression.
    pub expression: &'a str,
    /// Optional message supplied with the assertion.
    pub message: Option<&'a str>,
}

/// Sink for test-result events. Every method has a no-op default.
#[allow(unused_variables)]
pub trait ResultReceiver {
    /// A round has started.
    fn on_start(&mut self, round: &RoundStart) -> ReceiverResult {
        Ok(true)
    }

    /// A message was recorded for a case.
    fn on_message(&mut self, case: &TestCase, site: &Site<'_>, message: &str) -> ReceiverResult {
        Ok(true)
    }

    /// A case is about to produce its first output of the round.
    fn on_case_header(&mut self, case: &TestCase) -> ReceiverResult {
        Ok(true)
    }

    /// An assertion was recorded. `case` already includes it in its counters.
    fn on_result_line(&mut self, case: &TestCase, line: &ResultLine<'_>) -> ReceiverResult {
        Ok(true)
    }

    /// A start or stop timestamp, already formatted.
    fn on_timestamp(&mut self, is_start: bool, stamp: &str) -> ReceiverResult {
        Ok(true)
    }

    /// The summary table begins.
    fn on_summary_start(&mut self) -> ReceiverResult {
        Ok(true)
    }

    /// One summary table row.
    fn on_table_row(&mut self, case: &TestCase) -> ReceiverResult {
        Ok(true)
    }

    /// Item totals across all cases.
    fn on_totals_line(&mut self, totals: &Totals) -> ReceiverResult {
        Ok(true)
    }

    /// Case totals across all cases.
    fn on_summary_line(&mut self, totals: &Totals) -> ReceiverResult {
        Ok(true)
    }

    /// The summary table is complete.
    fn on_summary_end(&mut self) -> ReceiverResult {
        Ok(true)
    }

    /// The registry is going away. Release any remaining resources.
    fn on_final_teardown(&mut self) {}
}

/// Wraps a receiver so it can be registered and still be inspected by its owner.
pub fn share<R: ResultReceiver + 'static>(receiver: R) -> Rc<RefCell<R>> {
    Rc::new(RefCell::new(receiver))
}

/// Address identifying a shared receiver, independent of how it is typed.
pub(crate) fn receiver_addr<R: ?Sized>(receiver: &Rc<RefCell<R>>) -> *const () {
    Rc::as_ptr(receiver).cast::<()>()
}
