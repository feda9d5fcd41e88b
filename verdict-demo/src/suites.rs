//! The sample suites.
//!
//! Each suite registers one case and records a known mix of passing, warning,
//! failing, and panicking assertions, so the output of a run can be checked
//! by eye or by the CLI tests.

// Several checks compare a thingy with itself on purpose.
#![allow(clippy::eq_op)]

use std::panic::AssertUnwindSafe;

use verdict_core::{
    CaseHandle, FatalFailure, Severity, Site, TestRegistry, ut_check, ut_message, ut_require,
    ut_warn,
};

use crate::args::CommandLineArgs;
use crate::events::SUITES_TARGET;
use crate::thingy::{Stuff, Thingy};

/// Readable text of a string panic payload.
fn panic_text(payload: &(dyn std::any::Any + Send)) -> Option<&str> {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
}

/// Checks that an expression panics. Returning normally is a failure.
macro_rules! expect_panic {
    ($case:expr, $expr:expr) => {
        record_expected_panic(
            &$case,
            Site::new(file!(), line!()),
            stringify!($expr),
            catch(|| $expr),
        )
    };
}

/// Checks that an expression panics with [`Stuff`]. Any other panic counts as
/// an exception.
macro_rules! expect_stuff {
    ($case:expr, $expr:expr) => {
        record_expected_stuff(
            &$case,
            Site::new(file!(), line!()),
            stringify!($expr),
            catch(|| $expr),
        )
    };
}

type Caught = std::thread::Result<()>;

/// Runs `f` with panics caught. A failed requirement keeps unwinding.
fn catch<T>(f: impl FnOnce() -> T) -> Caught {
    std::panic::catch_unwind(AssertUnwindSafe(f))
        .map(|_| ())
        .map_err(|payload| {
            if payload.is::<FatalFailure>() {
                std::panic::resume_unwind(payload);
            }
            payload
        })
}

fn record_expected_panic(case: &CaseHandle<'_>, site: Site<'_>, expression: &str, caught: Caught) {
    match caught {
        Ok(()) => {
            case.record_result(site, Severity::Checked, false, expression, None);
        }
        Err(payload) => {
            let message = panic_text(payload.as_ref());
            case.record_result(site, Severity::Checked, true, expression, message);
        }
    }
}

fn record_expected_stuff(case: &CaseHandle<'_>, site: Site<'_>, expression: &str, caught: Caught) {
    match caught {
        Ok(()) => {
            case.record_result(site, Severity::Checked, false, expression, None);
        }
        Err(payload) => {
            if let Some(Stuff(message)) = payload.downcast_ref::<Stuff>() {
                case.record_result(site, Severity::Checked, true, expression, Some(*message));
            } else {
                case.record_exception(
                    site,
                    Severity::Checked,
                    expression,
                    panic_text(payload.as_ref()),
                );
            }
        }
    }
}

/// Runs the suites selected by the command line.
pub fn run_all(registry: &TestRegistry, args: &CommandLineArgs) -> Result<(), verdict_core::Error> {
    tracing::debug!(target: SUITES_TARGET, "running sample suites");

    passing_test(registry)?;
    just_warnings_test(registry)?;
    if args.passing_only {
        return Ok(());
    }

    thingy_1_test(registry)?;
    thingy_2_test(registry)?;
    empty_test(registry)?;
    exception_test(registry)?;
    if args.fatal {
        fatal_test(registry)?;
    }

    Ok(())
}

fn thingy_1_test(registry: &TestRegistry) -> Result<(), verdict_core::Error> {
    let case = registry.get_or_create("Test 1 Thingy")?;
    let just_one = Thingy::new(1);

    // Passing.
    ut_check!(case, !just_one.is_zero());
    ut_check!(case, !just_one.is_zero(), "This is not zero.");

    ut_message!(case, "You can output any message directly into the test results!");

    // Warnings.
    ut_warn!(case, just_one.is_zero());
    ut_warn!(case, !just_one.is_zero());
    ut_warn!(case, just_one.is_zero(), "This is just a warning.");
    ut_warn!(case, !just_one.is_zero(), "This is just a warning.");

    // Failing.
    ut_check!(case, just_one.is_zero());
    ut_check!(case, just_one.is_zero(), "This is not zero.");

    // The outcome of a check can drive further reporting.
    let passed = case.record_result(
        Site::new(file!(), line!()),
        Severity::Checked,
        just_one.is_zero(),
        "just_one.is_zero()",
        None,
    );
    if !passed {
        ut_message!(case, "Call to just_one.is_zero() failed!");
    }

    let passed = just_one.is_zero();
    ut_check!(case, passed, "Call to just_one.is_zero() failed!");

    ut_check!(case, just_one.throws_badly(false));
    ut_check!(case, just_one.throws_badly(true));
    ut_check!(case, just_one.throws_badly(false), "This should not panic!");
    ut_check!(case, just_one.throws_badly(true), "This can panic!");

    Ok(())
}

fn exception_test(registry: &TestRegistry) -> Result<(), verdict_core::Error> {
    let case = registry.get_or_create("Exception Test")?;
    let empty = Thingy::default();

    ut_check!(case, empty.throws_badly(false));
    ut_check!(case, empty.throws_badly(true));

    // Not panicking fails; any panic passes.
    expect_panic!(case, empty.throws_badly(false));
    expect_panic!(case, empty.throws_badly(true));

    // Not panicking fails.
    expect_stuff!(case, empty.throws_badly_with(false, false));
    expect_stuff!(case, empty.throws_badly_with(false, true));
    // Panicking with something other than stuff is an exception.
    expect_stuff!(case, empty.throws_badly_with(true, false));
    // Panicking with stuff passes.
    expect_stuff!(case, empty.throws_badly_with(true, true));

    Ok(())
}

fn thingy_2_test(registry: &TestRegistry) -> Result<(), verdict_core::Error> {
    let case = registry.get_or_create("Test 2 Thingys")?;
    let empty = Thingy::default();
    let negative = Thingy::new(-1);
    let positive = Thingy::new(1);

    // Passing.
    ut_check!(case, empty == empty);
    ut_check!(case, empty != negative);
    ut_check!(case, empty != positive);
    ut_check!(case, negative == negative);
    ut_check!(case, negative != positive);
    ut_check!(case, negative != empty);
    ut_check!(case, positive == positive);
    ut_check!(case, positive != negative);
    ut_check!(case, positive != empty);

    // Failing.
    ut_check!(case, empty != empty);
    ut_check!(case, empty == negative);
    ut_check!(case, empty == positive);
    ut_check!(case, negative != negative);
    ut_check!(case, negative == positive);
    ut_check!(case, positive != positive);
    ut_check!(case, positive == empty);

    Ok(())
}

fn passing_test(registry: &TestRegistry) -> Result<(), verdict_core::Error> {
    let case = registry.get_or_create("Passing Test")?;
    let empty = Thingy::default();
    let negative = Thingy::new(-1);

    ut_check!(case, empty == empty);
    ut_check!(case, empty != negative);
    ut_check!(case, negative == negative);
    ut_check!(case, negative != empty);

    Ok(())
}

fn just_warnings_test(registry: &TestRegistry) -> Result<(), verdict_core::Error> {
    let case = registry.get_or_create("Just Warnings Test")?;
    let empty = Thingy::default();
    let negative = Thingy::new(-1);
    let positive = Thingy::new(1);

    // Passing.
    ut_check!(case, empty == empty);
    ut_check!(case, empty != negative);
    ut_check!(case, empty != positive);
    ut_check!(case, negative == negative);
    ut_check!(case, negative != positive);
    ut_check!(case, negative != empty);
    ut_check!(case, positive == positive);
    ut_check!(case, positive != negative);
    ut_check!(case, positive != empty);

    // Warnings.
    ut_warn!(case, empty != empty);
    ut_warn!(case, empty == negative);
    ut_warn!(case, empty == positive);

    Ok(())
}

fn empty_test(registry: &TestRegistry) -> Result<(), verdict_core::Error> {
    registry.get_or_create("Empty Thingy Test")?;
    Ok(())
}

fn fatal_test(registry: &TestRegistry) -> Result<(), verdict_core::Error> {
    let case = registry.get_or_create("Fatal Thingy Test")?;
    let empty = Thingy::default();

    ut_require!(case, empty != empty);
    // Showing up in the output means the fatal path returned.
    ut_check!(case, false, "Why is this program still running?");

    Ok(())
}
