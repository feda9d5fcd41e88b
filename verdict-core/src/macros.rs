//! Assertion macros.
//!
//! Each macro takes a [`CaseHandle`](crate::CaseHandle) (or a reference to one),
//! captures the call site and the expression text, and evaluates the expression
//! with panics caught. A panicking expression is recorded as an exception.

/// Records a checked assertion. A failure marks the case as failed.
///
/// Evaluates to `true` if the expression held.
///
/// ```
/// use verdict_core::{OutputOptions, RegistryConfig, TestRegistry, ut_check};
///
/// let registry = TestRegistry::new(RegistryConfig::new("doc").with_options(OutputOptions::NOTHING));
/// let case = registry.get_or_create("arithmetic").unwrap();
/// assert!(ut_check!(case, 1 + 1 == 2));
/// assert!(!ut_check!(case, 2 + 2 == 5, "expected {} items", 5));
/// ```
#[macro_export]
macro_rules! ut_check {
    ($case:expr, $cond:expr $(,)?) => {
        $crate::__ut_assert!($crate::Severity::Checked, $case, $cond)
    };
    ($case:expr, $cond:expr, $($msg:tt)+) => {
        $crate::__ut_assert!($crate::Severity::Checked, $case, $cond, $($msg)+)
    };
}

/// Records a warning-level assertion. A failure is reported but the case still passes.
#[macro_export]
macro_rules! ut_warn {
    ($case:expr, $cond:expr $(,)?) => {
        $crate::__ut_assert!($crate::Severity::Warning, $case, $cond)
    };
    ($case:expr, $cond:expr, $($msg:tt)+) => {
        $crate::__ut_assert!($crate::Severity::Warning, $case, $cond, $($msg)+)
    };
}

/// Records a required assertion. A failure runs the registry's fatal path.
#[macro_export]
macro_rules! ut_require {
    ($case:expr, $cond:expr $(,)?) => {
        $crate::__ut_assert!($crate::Severity::Require, $case, $cond)
    };
    ($case:expr, $cond:expr, $($msg:tt)+) => {
        $crate::__ut_assert!($crate::Severity::Require, $case, $cond, $($msg)+)
    };
}

/// Records an informational message for a case.
#[macro_export]
macro_rules! ut_message {
    ($case:expr, $($msg:tt)+) => {
        $crate::CaseHandle::record_message(
            &$case,
            $crate::Site::new(::core::file!(), ::core::line!()),
            ::std::format!($($msg)+).as_str(),
        )
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __ut_assert {
    ($severity:expr, $case:expr, $cond:expr) => {
        $crate::__private::settle(
            &$case,
            $crate::Site::new(::core::file!(), ::core::line!()),
            $severity,
            ::core::stringify!($cond),
            ::core::option::Option::None,
            $crate::__private::evaluate(|| $cond),
        )
    };
    ($severity:expr, $case:expr, $cond:expr, $($msg:tt)+) => {
        $crate::__private::settle(
            &$case,
            $crate::Site::new(::core::file!(), ::core::line!()),
            $severity,
            ::core::stringify!($cond),
            ::core::option::Option::Some(::std::format!($($msg)+).as_str()),
            $crate::__private::evaluate(|| $cond),
        )
    };
}

#[doc(hidden)]
pub mod __private {
    use crate::outcome::Severity;
    use crate::receiver::Site;
    use crate::registry::{CaseHandle, FatalFailure, panic_message};

    /// Evaluates an asserted expression, turning a panic into its message.
    ///
    /// A failed requirement inside the expression keeps unwinding; the run is
    /// over and nothing more may be recorded.
    pub fn evaluate(cond: impl FnOnce() -> bool) -> Result<bool, String> {
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(cond)).map_err(|payload| {
            if payload.is::<FatalFailure>() {
                std::panic::resume_unwind(payload);
            }
            panic_message(payload.as_ref())
        })
    }

    /// Records an evaluated assertion on `case`.
    pub fn settle(
        case: &CaseHandle<'_>,
        site: Site<'_>,
        severity: Severity,
        expression: &str,
        message: Option<&str>,
        outcome: Result<bool, String>,
    ) -> bool {
        match outcome {
            Ok(passed) => case.record_result(site, severity, passed, expression, message),
            Err(panicked) => {
                case.record_exception(
                    site,
                    severity,
                    expression,
                    Some(message.unwrap_or(panicked.as_str())),
                );
                false
            }
        }
    }
}
