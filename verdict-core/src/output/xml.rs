//! XML results in the `UnitTestResults` schema.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Context;

use super::{FileSink, escape_markup};
use crate::case::{TestCase, Totals};
use crate::receiver::{ReceiverResult, ResultLine, ResultReceiver, Site};
use crate::round::RoundStart;
use crate::trace_categories;

const FATAL_TEXT: &str =
    "A required test failed!  Unable to safely execute further tests!  Program must exit now!";

/// Writes results as an XML document per round.
///
/// The document is closed at the end of the summary table, at the start of the
/// next round, or at teardown, whichever comes first.
pub struct XmlReceiver {
    partial: PathBuf,
    file: FileSink,
    tests_open: bool,
    summary_open: bool,
}

impl XmlReceiver {
    /// Creates an XML receiver. Files are named after `partial` plus the round start time.
    ///
    /// Every line carries the case index, so no output option affects the document.
    pub fn new(partial: PathBuf) -> Self {
        Self {
            partial,
            file: FileSink::default(),
            tests_open: false,
            summary_open: false,
        }
    }

    fn emit(&mut self, text: &str) -> ReceiverResult {
        if !self.file.is_open() {
            return Ok(false);
        }
        self.file.write_str(text)?;
        Ok(true)
    }

    /// Closes the `<Tests>` element before the first post-test element.
    fn close_tests(&mut self) -> std::io::Result<()> {
        if self.tests_open {
            self.file.write_str("\t</Tests>\n")?;
            self.tests_open = false;
        }
        Ok(())
    }

    fn finish_document(&mut self) -> anyhow::Result<()> {
        if !self.file.is_open() {
            return Ok(());
        }

        self.close_tests()?;
        if self.summary_open {
            self.file.write_str("\t</SummaryTable>\n")?;
            self.summary_open = false;
        }
        self.file.write_str("</UnitTestResults>\n")?;
        self.file.close()?;
        Ok(())
    }
}

fn totals_element(element: &str, totals: &Totals) -> String {
    format!(
        "\t\t<{element}\n\
         \t\t\tresult=\"{}\"\n\
         \t\t\tpassed=\"{}\"\n\
         \t\t\twarnings=\"{}\"\n\
         \t\t\tfailed=\"{}\"\n\
         \t\t\texceptions=\"{}\"\n\
         \t\t\ttested=\"{}\">\n\
         \t\t</{element}>\n",
        totals.label(),
        totals.passed,
        totals.warned,
        totals.failed,
        totals.thrown,
        totals.total
    )
}

impl ResultReceiver for XmlReceiver {
    fn on_start(&mut self, round: &RoundStart) -> ReceiverResult {
        self.finish_document()?;

        let path = round.file_name(&self.partial, ".xml");
        self.file
            .open(path.clone())
            .with_context(|| format!("failed to open {}", path.display()))?;
        tracing::debug!(target: trace_categories::OUTPUT, "writing XML results to {}", path.display());

        self.tests_open = true;
        self.summary_open = false;
        let text = format!(
            "<UnitTestResults\n\tname=\"{}\">\n\t<Tests>\n",
            escape_markup(round.name())
        );
        self.emit(&text)
    }

    fn on_message(&mut self, case: &TestCase, site: &Site<'_>, message: &str) -> ReceiverResult {
        let text = format!(
            "\t\t<Message\n\
             \t\t\tfile=\"{}\"\n\
             \t\t\tline=\"{}\"\n\
             \t\t\tunit=\"{}\">\n\
             \t\t\t<message>{}</message>\n\
             \t\t</Message>\n",
            escape_markup(site.file),
            site.line,
            case.index(),
            escape_markup(message)
        );
        self.emit(&text)
    }

    fn on_case_header(&mut self, case: &TestCase) -> ReceiverResult {
        let text = format!(
            "\t\t<Unit\n\t\t\tname=\"{}\"\n\t\t\tunit=\"{}\">\n\t\t</Unit>\n",
            escape_markup(case.name().as_str()),
            case.index()
        );
        self.emit(&text)
    }

    fn on_result_line(&mut self, case: &TestCase, line: &ResultLine<'_>) -> ReceiverResult {
        let mut text = format!(
            "\t\t<Test\n\
             \t\t\tfile=\"{}\"\n\
             \t\t\tline=\"{}\"\n\
             \t\t\tresult=\"{}\"\n\
             \t\t\tunit=\"{}\"\n\
             \t\t\tindex=\"{}\">\n\
             \t\t\t<expression>{}</expression>\n",
            escape_markup(line.site.file),
            line.site.line,
            line.result.label(),
            case.index(),
            case.items(),
            escape_markup(line.expression)
        );
        if let Some(message) = line.message {
            let _ = writeln!(text, "\t\t\t<message>{}</message>", escape_markup(message));
        }
        if line.result.is_fatal() {
            let _ = writeln!(text, "\t\t\t<fatal>{FATAL_TEXT}</fatal>");
        }
        text.push_str("\t\t</Test>\n");

        self.emit(&text)
    }

    fn on_timestamp(&mut self, is_start: bool, stamp: &str) -> ReceiverResult {
        if !self.file.is_open() {
            return Ok(false);
        }

        let text = if is_start {
            self.close_tests()?;
            format!("\t<TimeStamps\n\t\tstart=\"{}\"\n", escape_markup(stamp))
        } else {
            format!("\t\tstop=\"{}\">\n\t</TimeStamps>\n", escape_markup(stamp))
        };
        self.emit(&text)
    }

    fn on_summary_start(&mut self) -> ReceiverResult {
        if !self.file.is_open() {
            return Ok(false);
        }

        self.close_tests()?;
        self.summary_open = true;
        self.emit("\t<SummaryTable>\n")
    }

    fn on_table_row(&mut self, case: &TestCase) -> ReceiverResult {
        let text = format!(
            "\t\t<UnitTest\n\
             \t\t\tname=\"{}\"\n\
             \t\t\tindex=\"{}\"\n\
             \t\t\tresult=\"{}\"\n\
             \t\t\tpassed=\"{}\"\n\
             \t\t\twarnings=\"{}\"\n\
             \t\t\tfailed=\"{}\"\n\
             \t\t\texceptions=\"{}\"\n\
             \t\t\ttested=\"{}\">\n\
             \t\t</UnitTest>\n",
            escape_markup(case.name().as_str()),
            case.index(),
            if case.did_pass() { "Passed" } else { "FAILED" },
            case.passed(),
            case.warned(),
            case.failed(),
            case.thrown(),
            case.items()
        );
        self.emit(&text)
    }

    fn on_totals_line(&mut self, totals: &Totals) -> ReceiverResult {
        self.emit(&totals_element("ItemTotals", totals))
    }

    fn on_summary_line(&mut self, totals: &Totals) -> ReceiverResult {
        self.emit(&totals_element("TestTotals", totals))
    }

    fn on_summary_end(&mut self) -> ReceiverResult {
        if !self.file.is_open() {
            return Ok(false);
        }
        self.finish_document()?;
        Ok(true)
    }

    fn on_final_teardown(&mut self) {
        if let Err(e) = self.finish_document() {
            tracing::warn!(target: trace_categories::OUTPUT, "failed to finish XML results: {e:#}");
        }
    }
}
