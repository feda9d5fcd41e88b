//! A receiver that watches for failures, for `--strict` runs.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use anyhow::ensure;
use verdict_core::{
    Error, ReceiverResult, ResultLine, ResultReceiver, RoundStart, TestCase, TestRegistry, share,
};

use crate::events::SUITES_TARGET;

/// Counts failed, fatal, and thrown results.
///
/// At the start of each round it also checks that the registry refuses to be
/// changed while it is calling receivers.
pub struct StrictReceiver {
    registry: Weak<TestRegistry>,
    failures: Rc<Cell<u32>>,
}

impl StrictReceiver {
    /// Subscribes a new strict receiver and returns its failure counter.
    pub fn attach(registry: &Rc<TestRegistry>) -> Result<Rc<Cell<u32>>, Error> {
        let failures = Rc::new(Cell::new(0));
        registry.add_receiver(share(Self {
            registry: Rc::downgrade(registry),
            failures: failures.clone(),
        }))?;
        Ok(failures)
    }
}

impl ResultReceiver for StrictReceiver {
    fn on_start(&mut self, _round: &RoundStart) -> ReceiverResult {
        let Some(registry) = self.registry.upgrade() else {
            return Ok(true);
        };

        let intruder = share(Self {
            registry: self.registry.clone(),
            failures: self.failures.clone(),
        });
        ensure!(
            matches!(registry.add_receiver(intruder.clone()), Err(Error::Busy)),
            "registry accepted a receiver while broadcasting"
        );
        ensure!(
            matches!(registry.remove_receiver(&intruder), Err(Error::Busy)),
            "registry removed a receiver while broadcasting"
        );
        ensure!(
            matches!(registry.get_or_create("Test 1 Thingy"), Err(Error::Busy)),
            "registry created a case while broadcasting"
        );

        Ok(true)
    }

    fn on_result_line(&mut self, case: &TestCase, line: &ResultLine<'_>) -> ReceiverResult {
        if line.result.is_failure() {
            self.failures.set(self.failures.get() + 1);
            tracing::debug!(
                target: SUITES_TARGET,
                "strict: {} in '{}' at {}({}): {}",
                line.result,
                case.name(),
                line.site.file,
                line.site.line,
                line.expression
            );
        }
        Ok(true)
    }
}
