//! Severity levels and the results they map to.

/// How strongly an assertion is enforced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, strum_macros::Display)]
pub enum Severity {
    /// A failure is reported but doesn't mark the case as failed.
    Warning,
    /// A failure marks the case as failed; testing continues.
    Checked,
    /// A failure marks the case as failed and ends the run.
    Require,
}

/// Outcome of a single recorded assertion.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::IntoStaticStr,
)]
pub enum TestResult {
    /// The assertion held.
    #[strum(serialize = "Passed")]
    Passed,
    /// A warning-level assertion did not hold.
    #[strum(serialize = "Warning")]
    Warning,
    /// A checked assertion did not hold.
    #[strum(serialize = "FAILED")]
    Failed,
    /// A required assertion did not hold, or panicked.
    #[strum(serialize = "FATAL")]
    Fatal,
    /// The asserted expression panicked.
    #[strum(serialize = "THROWN")]
    Thrown,
}

impl TestResult {
    /// Maps an evaluated assertion to its result.
    pub const fn from_check(severity: Severity, passed: bool) -> Self {
        if passed {
            return Self::Passed;
        }

        match severity {
            Severity::Warning => Self::Warning,
            Severity::Checked => Self::Failed,
            Severity::Require => Self::Fatal,
        }
    }

    /// Maps an assertion whose expression panicked to its result.
    pub const fn from_panic(severity: Severity) -> Self {
        match severity {
            Severity::Require => Self::Fatal,
            Severity::Warning | Severity::Checked => Self::Thrown,
        }
    }

    /// Returns the fixed display label (e.g. `FAILED`).
    pub fn label(self) -> &'static str {
        self.into()
    }

    /// Returns true for results that always reach the receivers.
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Fatal | Self::Thrown)
    }

    /// Returns true if this result ends the run.
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Fatal)
    }

    /// Color used by the HTML writer when rendering a line with this result.
    pub const fn html_color(self) -> &'static str {
        match self {
            Self::Passed => "green",
            Self::Warning => "yellow",
            Self::Failed | Self::Fatal | Self::Thrown => "red",
        }
    }
}
