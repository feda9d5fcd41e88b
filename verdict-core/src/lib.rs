//! Unit-test result aggregation with pluggable output.
//!
//! A [`TestRegistry`] owns named test cases, counts the outcome of every
//! assertion recorded against them, and broadcasts each event to a list of
//! [`ResultReceiver`]s in a fixed call order.
//!
//! # Recording results
//!
//! Cases are looked up (or created) by name through
//! [`TestRegistry::get_or_create`]. Assertions are usually recorded through the
//! [`ut_check!`], [`ut_warn!`], [`ut_require!`], and [`ut_message!`] macros,
//! which capture the call site and the expression text.
//!
//! # Severity
//!
//! - **Warning**: a failure is reported; the case still passes.
//! - **Checked**: a failure marks the case as failed; testing continues.
//! - **Require**: a failure marks the case as failed and ends the run, after
//!   flushing the summary (see [`FatalPolicy`]).
//!
//! An assertion whose expression panics is counted as *thrown*.
//!
//! # Output
//!
//! Built-in receivers write plain text (to a file and/or the standard streams),
//! HTML (with a rolling history page), XML, and JUnit XML. Which ones are active,
//! and what they show, is controlled by [`RegistryConfig`] and [`OutputOptions`].
//! Custom receivers implement [`ResultReceiver`] and are registered with
//! [`TestRegistry::add_receiver`].

mod case;
mod error;
mod macros;
mod options;
mod outcome;
pub mod output;
mod receiver;
mod registry;
pub mod round;
pub mod trace_categories;

#[doc(hidden)]
pub use macros::__private;

pub use case::{CaseName, MAX_CASE_NAME_CHARS, TestCase, Totals};
pub use error::Error;
pub use options::{
    DEFAULT_REGISTRY_NAME, FatalAction, FatalPolicy, OutputOptions, RegistryConfig,
};
pub use outcome::{Severity, TestResult};
pub use receiver::{ReceiverResult, ResultLine, ResultReceiver, SharedReceiver, Site, share};
pub use registry::{CaseHandle, FatalFailure, TestRegistry};
pub use round::RoundStart;
