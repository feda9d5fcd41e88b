//! Plain-text results, written identically to a file and/or the standard streams.

use std::fmt::Write as _;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;

use super::FileSink;
use crate::case::{TestCase, Totals};
use crate::options::OutputOptions;
use crate::receiver::{ReceiverResult, ResultLine, ResultReceiver, Site};
use crate::round::{BEGAN_AT, ENDED_AT, RoundStart};
use crate::trace_categories;

const DIVIDER: &str =
    "-------------------------------------------------------------------------------";
const MAX_SHOWN_FILE_CHARS: usize = 256;
const FATAL_NOTICE: &str =
    "A required test failed!\nUnable to safely execute further tests!\nProgram must exit now!\n";

/// Writes results as plain text.
pub struct TextReceiver {
    partial: Option<PathBuf>,
    to_stdout: bool,
    to_stderr: bool,
    dividers: bool,
    indexes: bool,
    file: FileSink,
}

impl TextReceiver {
    /// Creates a text receiver. Files are named after `partial` plus the round start time.
    pub fn new(partial: Option<PathBuf>, options: OutputOptions) -> Self {
        Self {
            partial,
            to_stdout: options.contains(OutputOptions::SEND_TO_STDOUT),
            to_stderr: options.contains(OutputOptions::SEND_TO_STDERR),
            dividers: options.contains(OutputOptions::DIVIDERS),
            indexes: options.contains(OutputOptions::ADD_TEST_INDEX),
            file: FileSink::default(),
        }
    }

    fn has_output(&self) -> bool {
        self.to_stdout || self.to_stderr || self.file.is_open()
    }

    fn emit(&mut self, text: &str) -> ReceiverResult {
        if !self.has_output() {
            return Ok(false);
        }

        if self.to_stdout {
            let mut out = std::io::stdout().lock();
            out.write_all(text.as_bytes())?;
            out.flush()?;
        }
        if self.to_stderr {
            let mut err = std::io::stderr().lock();
            err.write_all(text.as_bytes())?;
            err.flush()?;
        }
        self.file.write_str(text)?;
        self.file.flush()?;

        Ok(true)
    }

    fn divider_line(&self) -> String {
        if self.dividers {
            format!("{DIVIDER}\n")
        } else {
            String::new()
        }
    }

    fn format_message(&self, case: &TestCase, site: &Site<'_>, message: &str) -> String {
        let mut text = format!("{}({}) : ", shown_file(site.file), site.line);
        if self.indexes {
            let _ = write!(text, "{} ", case.index());
        }
        let _ = writeln!(text, "{message}");
        text
    }

    fn format_header(&self, case: &TestCase) -> String {
        format!(
            "\nTest: {:>3}\t\t{}\n{}",
            case.index(),
            case.name(),
            self.divider_line()
        )
    }

    fn format_line(&self, case: &TestCase, line: &ResultLine<'_>) -> String {
        let mut text = format!(
            "{}({}) : {:>8}  ",
            shown_file(line.site.file),
            line.site.line,
            line.result.label()
        );

        if self.indexes {
            let _ = write!(text, "  {}:{}", case.index(), case.items());
        } else {
            let _ = write!(text, "{:>4}", case.items());
        }

        let _ = write!(text, "  ({})", line.expression);
        if let Some(message) = line.message {
            let _ = write!(text, "  {message}");
        }
        text.push('\n');

        if line.result.is_fatal() {
            text.push_str(FATAL_NOTICE);
        }

        text
    }

    fn format_totals(&self, title: &str, totals: &Totals) -> String {
        format!(
            "{}{}\t   {title:<24}\t{:>6}\t{:>6}\t{:>6}\t{:>6}\t{:>6}\n\n",
            self.divider_line(),
            totals.short_label(),
            totals.passed,
            totals.warned,
            totals.failed,
            totals.thrown,
            totals.total
        )
    }
}

/// File names are shown by at most their last 256 characters.
fn shown_file(file: &str) -> &str {
    let count = file.chars().count();
    if count <= MAX_SHOWN_FILE_CHARS {
        return file;
    }

    let skip = count - MAX_SHOWN_FILE_CHARS;
    file.char_indices()
        .nth(skip)
        .map_or(file, |(start, _)| &file[start..])
}

fn format_row(case: &TestCase) -> String {
    format!(
        "{}  {:>3}  {:<24}\t{:>6}\t{:>6}\t{:>6}\t{:>6}\t{:>6}\n",
        case.outcome_label(),
        case.index(),
        case.name().as_str(),
        case.passed(),
        case.warned(),
        case.failed(),
        case.thrown(),
        case.items()
    )
}

impl ResultReceiver for TextReceiver {
    fn on_start(&mut self, round: &RoundStart) -> ReceiverResult {
        if let Some(partial) = &self.partial {
            let path = round.file_name(partial, ".txt");
            if let Err(e) = self.file.open(path.clone()) {
                if !self.to_stdout && !self.to_stderr {
                    return Err(e)
                        .with_context(|| format!("failed to open {}", path.display()));
                }
                tracing::warn!(
                    target: trace_categories::OUTPUT,
                    "failed to open text output {}: {e}",
                    path.display()
                );
            }
        }

        self.emit(&format!("Name of Unit Tests: {}\n", round.name()))
    }

    fn on_message(&mut self, case: &TestCase, site: &Site<'_>, message: &str) -> ReceiverResult {
        let text = self.format_message(case, site, message);
        self.emit(&text)
    }

    fn on_case_header(&mut self, case: &TestCase) -> ReceiverResult {
        let text = self.format_header(case);
        self.emit(&text)
    }

    fn on_result_line(&mut self, case: &TestCase, line: &ResultLine<'_>) -> ReceiverResult {
        let text = self.format_line(case, line);
        self.emit(&text)
    }

    fn on_timestamp(&mut self, is_start: bool, stamp: &str) -> ReceiverResult {
        let text = if is_start {
            format!("\n{BEGAN_AT}{stamp}\n")
        } else {
            format!("{ENDED_AT}{stamp}\n")
        };
        self.emit(&text)
    }

    fn on_summary_start(&mut self) -> ReceiverResult {
        let text = format!(
            "\n\t#  Unit Test Name\t\tPassed\tWarning\tFailed\tThrown\tTested\n{}",
            self.divider_line()
        );
        self.emit(&text)
    }

    fn on_table_row(&mut self, case: &TestCase) -> ReceiverResult {
        self.emit(&format_row(case))
    }

    fn on_totals_line(&mut self, totals: &Totals) -> ReceiverResult {
        let text = self.format_totals("Item Totals", totals);
        self.emit(&text)
    }

    fn on_summary_line(&mut self, totals: &Totals) -> ReceiverResult {
        let text = self.format_totals("Unit Test Totals", totals);
        self.emit(&text)
    }

    fn on_summary_end(&mut self) -> ReceiverResult {
        self.file.close()?;
        Ok(true)
    }

    fn on_final_teardown(&mut self) {
        if let Err(e) = self.file.close() {
            tracing::warn!(target: trace_categories::OUTPUT, "failed to close text output: {e}");
        }
    }
}
