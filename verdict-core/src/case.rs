//! Test cases and their counters.

use std::fmt::Display;

use crate::error::Error;
use crate::outcome::TestResult;

/// Maximum number of characters kept in a case name.
pub const MAX_CASE_NAME_CHARS: usize = 23;

/// Name of a test case, bounded to [`MAX_CASE_NAME_CHARS`] characters.
///
/// Longer names are truncated at a character boundary. Two names that share
/// the same first [`MAX_CASE_NAME_CHARS`] characters therefore refer to the
/// same case.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CaseName(String);

impl CaseName {
    /// Creates a bounded name, truncating if needed.
    pub fn new(name: &str) -> Result<Self, Error> {
        if name.is_empty() {
            return Err(Error::EmptyName);
        }

        Ok(Self(name.chars().take(MAX_CASE_NAME_CHARS).collect()))
    }

    /// Returns the (possibly truncated) name.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for CaseName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.0.as_str())
    }
}

impl AsRef<str> for CaseName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Accumulated counters for one named group of assertions.
///
/// Receivers get read-only access to cases; counters only move through the
/// registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    name: CaseName,
    index: usize,
    items: u32,
    passed: u32,
    warned: u32,
    failed: u32,
    thrown: u32,
    header_emitted: bool,
}

impl TestCase {
    pub(crate) const fn new(name: CaseName, index: usize) -> Self {
        Self {
            name,
            index,
            items: 0,
            passed: 0,
            warned: 0,
            failed: 0,
            thrown: 0,
            header_emitted: false,
        }
    }

    /// Name of the case.
    pub const fn name(&self) -> &CaseName {
        &self.name
    }

    /// 1-based registration index.
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Number of recorded items (results and exceptions).
    pub const fn items(&self) -> u32 {
        self.items
    }

    /// Number of passed items.
    pub const fn passed(&self) -> u32 {
        self.passed
    }

    /// Number of failed warning-level items.
    pub const fn warned(&self) -> u32 {
        self.warned
    }

    /// Number of failed checked or required items.
    pub const fn failed(&self) -> u32 {
        self.failed
    }

    /// Number of items whose expression panicked.
    pub const fn thrown(&self) -> u32 {
        self.thrown
    }

    /// Whether this case's header has been emitted in the current round.
    pub const fn header_emitted(&self) -> bool {
        self.header_emitted
    }

    /// True when nothing failed and nothing was thrown.
    pub const fn did_pass(&self) -> bool {
        self.failed == 0 && self.thrown == 0
    }

    /// Result label used in summary rows: `FAILED`, `Empty!`, or `Passed`.
    pub const fn outcome_label(&self) -> &'static str {
        if !self.did_pass() {
            "FAILED"
        } else if self.items == 0 {
            "Empty!"
        } else {
            "Passed"
        }
    }

    /// The case's item counters as a [`Totals`] value.
    pub const fn totals(&self) -> Totals {
        Totals {
            passed: self.passed,
            warned: self.warned,
            failed: self.failed,
            thrown: self.thrown,
            total: self.items,
        }
    }

    pub(crate) const fn mark_header_emitted(&mut self) {
        self.header_emitted = true;
    }

    pub(crate) fn tally(&mut self, result: TestResult) {
        self.items += 1;
        match result {
            TestResult::Passed => self.passed += 1,
            TestResult::Warning => self.warned += 1,
            TestResult::Failed | TestResult::Fatal => self.failed += 1,
            TestResult::Thrown => self.thrown += 1,
        }

        self.check_invariants();
    }

    /// Counts a panicking expression. A fatal panic counts as thrown, not failed.
    pub(crate) fn tally_exception(&mut self) {
        self.items += 1;
        self.thrown += 1;
        self.check_invariants();
    }

    fn check_invariants(&self) {
        debug_assert_eq!(
            self.items,
            self.passed + self.warned + self.failed + self.thrown,
            "item count out of sync for case '{}'",
            self.name
        );
    }
}

/// Aggregate counters, used both for item totals and for case totals.
///
/// For item totals each field counts assertions. For case totals `passed` and
/// `failed` count cases by [`TestCase::did_pass`], `warned` and `thrown` count
/// cases with at least one warning or exception, and `total` counts cases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Totals {
    /// Passed count.
    pub passed: u32,
    /// Warning count.
    pub warned: u32,
    /// Failed count.
    pub failed: u32,
    /// Thrown count.
    pub thrown: u32,
    /// Overall count.
    pub total: u32,
}

impl Totals {
    /// Sums the item counters of all cases.
    pub fn items_of<'a>(cases: impl IntoIterator<Item = &'a TestCase>) -> Self {
        cases.into_iter().fold(Self::default(), |mut acc, case| {
            acc.passed += case.passed;
            acc.warned += case.warned;
            acc.failed += case.failed;
            acc.thrown += case.thrown;
            acc.total += case.items;
            acc
        })
    }

    /// Counts cases by outcome.
    pub fn cases_of<'a>(cases: impl IntoIterator<Item = &'a TestCase>) -> Self {
        cases.into_iter().fold(Self::default(), |mut acc, case| {
            if case.did_pass() {
                acc.passed += 1;
            } else {
                acc.failed += 1;
            }
            if case.warned > 0 {
                acc.warned += 1;
            }
            if case.thrown > 0 {
                acc.thrown += 1;
            }
            acc.total += 1;
            acc
        })
    }

    /// True when nothing failed and nothing was thrown.
    pub const fn did_pass(&self) -> bool {
        self.failed == 0 && self.thrown == 0
    }

    /// `Pass` or `FAIL`, as shown on totals lines.
    pub const fn short_label(&self) -> &'static str {
        if self.did_pass() { "Pass" } else { "FAIL" }
    }

    /// `Passed` or `FAILED`.
    pub const fn label(&self) -> &'static str {
        if self.did_pass() { "Passed" } else { "FAILED" }
    }
}
