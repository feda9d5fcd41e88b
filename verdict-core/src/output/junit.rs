//! JUnit XML results, for consumption by CI systems.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::case::TestCase;
use crate::receiver::{ReceiverResult, ResultLine, ResultReceiver, Site};
use crate::round::RoundStart;
use crate::trace_categories;

#[derive(Default)]
struct CaseRecord {
    latest: Option<TestCase>,
    output: Vec<String>,
}

/// Writes one JUnit test suite per round, with one test case per registry case.
///
/// Counters come from the summary table rows when the summary table is enabled;
/// otherwise from the last event seen for each case.
pub struct JunitReceiver {
    partial: PathBuf,
    round: Option<RoundStart>,
    records: BTreeMap<usize, CaseRecord>,
}

impl JunitReceiver {
    /// Creates a JUnit receiver. Files are named after `partial` plus the round start
    /// time, with a `.junit.xml` extension.
    pub fn new(partial: PathBuf) -> Self {
        Self {
            partial,
            round: None,
            records: BTreeMap::new(),
        }
    }

    fn observe(&mut self, case: &TestCase) -> &mut CaseRecord {
        let record = self.records.entry(case.index()).or_default();
        record.latest = Some(case.clone());
        record
    }

    fn write_report(&mut self) -> Result<()> {
        let Some(round) = self.round.take() else {
            return Ok(());
        };
        let records = std::mem::take(&mut self.records);

        let mut report = junit_report::Report::new();
        let mut suite = junit_report::TestSuite::new(round.name());

        for record in records.into_values() {
            let Some(case) = record.latest else {
                continue;
            };

            let name = case.name().as_str();
            let mut test_case: junit_report::TestCase = if case.did_pass() {
                junit_report::TestCase::success(name, std::time::Duration::ZERO.try_into()?)
            } else {
                junit_report::TestCase::failure(
                    name,
                    std::time::Duration::ZERO.try_into()?,
                    "test failure",
                    format!(
                        "{} failed, {} thrown of {} item(s)",
                        case.failed(),
                        case.thrown(),
                        case.items()
                    )
                    .as_str(),
                )
            };

            if !record.output.is_empty() {
                test_case.set_system_out(record.output.join("\n").as_str());
            }

            suite.add_testcase(test_case);
        }

        report.add_testsuite(suite);

        let path = round.file_name(&self.partial, ".junit.xml");
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        report.write_xml(BufWriter::new(file))?;

        tracing::debug!(target: trace_categories::OUTPUT, "wrote JUnit results to {}", path.display());
        Ok(())
    }
}

impl ResultReceiver for JunitReceiver {
    fn on_start(&mut self, round: &RoundStart) -> ReceiverResult {
        self.write_report()?;
        self.round = Some(round.clone());
        Ok(true)
    }

    fn on_message(&mut self, case: &TestCase, site: &Site<'_>, message: &str) -> ReceiverResult {
        let text = format!("{}({}) : {message}", site.file, site.line);
        self.observe(case).output.push(text);
        Ok(true)
    }

    fn on_case_header(&mut self, case: &TestCase) -> ReceiverResult {
        self.observe(case);
        Ok(true)
    }

    fn on_result_line(&mut self, case: &TestCase, line: &ResultLine<'_>) -> ReceiverResult {
        let mut text = format!(
            "{}({}) : {}  ({})",
            line.site.file,
            line.site.line,
            line.result.label(),
            line.expression
        );
        if let Some(message) = line.message {
            text.push_str("  ");
            text.push_str(message);
        }
        self.observe(case).output.push(text);
        Ok(true)
    }

    fn on_table_row(&mut self, case: &TestCase) -> ReceiverResult {
        self.observe(case);
        Ok(true)
    }

    fn on_summary_end(&mut self) -> ReceiverResult {
        self.write_report()?;
        Ok(true)
    }

    fn on_final_teardown(&mut self) {
        if let Err(e) = self.write_report() {
            tracing::warn!(target: trace_categories::OUTPUT, "failed to write JUnit results: {e:#}");
        }
    }
}
