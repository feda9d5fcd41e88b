//! HTML results: one page per round plus a main page listing recent rounds.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{FileSink, escape_markup};
use crate::case::{TestCase, Totals};
use crate::options::OutputOptions;
use crate::receiver::{ReceiverResult, ResultLine, ResultReceiver, Site};
use crate::round::{self, BEGAN_AT, ENDED_AT, RoundStart};
use crate::trace_categories;

/// Maximum number of rounds listed on the main page.
pub const MAX_HISTORY_ROWS: usize = 90;

const PAGE_HEAD: &str = "<html><head><title>Unit Test Results</title></head>\n";
const TABLE_OPEN: &str = "<br><table border=1 cellspacing=0 cellpadding=3>\n";
const TABLE_CAPTION: &str = "<caption><em>Unit Test Results</em></caption>\n";
const PAGE_END: &str = "</body>\n</html>\n";

const LEGEND: &str = concat!(
    "<table border=1 cellspacing=0 cellpadding=3>\n",
    "<caption><em>Legend</em></caption>\n",
    "<tr><th>Color</th><th>Purpose</th></tr>\n",
    "<tr><td>white</td><td>information</td></tr>\n",
    "<tr><td><span style=\"color: green\">green</span></td>",
    "<td><span style=\"color: green\">passed</span></td></tr>\n",
    "<tr><td><span style=\"color: yellow\">yellow</span></td>",
    "<td><span style=\"color: yellow\">warning</span></td></tr>\n",
    "<tr><td><span style=\"color: red\">red</span></td>",
    "<td><span style=\"color: red\">failure</span></td></tr>\n",
    "</table><br>\n",
);

const HISTORY_HEADER: &str = concat!(
    "<tr><th>Time Stamp</th><th>Test Name</th><th>Result</th>",
    "<th>Items<br>Passed</th><th>Warning<br>Items</th>",
    "<th>Items<br>Failed</th>",
    "<th>Items<br>Thrown</th><th>Total<br>Items</th>",
    "<th>Tests<br>Passed</th><th>Tests w/<br>Warnings</th>",
    "<th>Tests<br>Failed</th>",
    "<th>Tests<br>Thrown</th><th>Total<br>Tests</th></tr>\n",
);

/// Colors used to render a set of counters.
struct ResultColors {
    fail: &'static str,
    warn: &'static str,
    pass: &'static str,
    thrown: &'static str,
    overall: &'static str,
    label: &'static str,
}

impl ResultColors {
    const fn new(totals: &Totals) -> Self {
        let (overall, label) = if totals.failed > 0 || totals.thrown > 0 {
            ("red", "FAILED")
        } else if totals.warned > 0 {
            ("yellow", "Passed")
        } else if totals.total == 0 {
            ("white", "Empty!")
        } else {
            ("green", "Passed")
        };

        Self {
            fail: if totals.failed == 0 { "green" } else { "red" },
            warn: if totals.warned == 0 { "green" } else { "yellow" },
            pass: if totals.passed > 0 { "green" } else { "red" },
            thrown: if totals.thrown == 0 { "green" } else { "red" },
            overall,
            label,
        }
    }
}

fn colored(color: &str, content: impl std::fmt::Display) -> String {
    format!("<span style=\"color: {color}\">{content}</span>")
}

/// Writes results as HTML pages.
pub struct HtmlReceiver {
    partial: PathBuf,
    indexes: bool,
    file: FileSink,
    round: Option<RoundStart>,
    items: Totals,
    cases: Totals,
}

impl HtmlReceiver {
    /// Creates an HTML receiver. Round pages are named after `partial` plus the round
    /// start time; the main page is `partial` + `.html`.
    pub fn new(partial: PathBuf, options: OutputOptions) -> Self {
        Self {
            partial,
            indexes: options.contains(OutputOptions::ADD_TEST_INDEX),
            file: FileSink::default(),
            round: None,
            items: Totals::default(),
            cases: Totals::default(),
        }
    }

    fn emit(&mut self, text: &str) -> ReceiverResult {
        if !self.file.is_open() {
            return Ok(false);
        }
        self.file.write_str(text)?;
        Ok(true)
    }

    fn format_line(&self, case: &TestCase, line: &ResultLine<'_>) -> String {
        let mut body = format!(
            "{}({}) : {}    ",
            escape_markup(line.site.file),
            line.site.line,
            line.result.label()
        );
        if self.indexes {
            let _ = write!(body, "{}:", case.index());
        }
        let _ = write!(body, "{}  ({})", case.items(), escape_markup(line.expression));
        if let Some(message) = line.message {
            let _ = write!(body, "  {}", escape_markup(message));
        }

        let mut text = format!("{}<br>\n", colored(line.result.html_color(), body));
        if line.result.is_fatal() {
            text.push_str(concat!(
                "<span style=\"color: red\">A required test failed!<br>\n",
                "Unable to safely execute further tests!<br>\n",
                "Program must exit now!</span><br>\n",
            ));
        }

        text
    }

    fn history_row(&self, round: &RoundStart, page: &Path) -> String {
        let items = ResultColors::new(&self.items);
        let cases = ResultColors::new(&self.cases);

        let mut row = format!(
            "<tr><td><a href='{}'>{}</a></td>\n<td>{}</td>\n<td>{}</td>\n",
            escape_markup(&round::relative_link(page)),
            round.history_stamp(),
            escape_markup(round.name()),
            colored(items.overall, items.label)
        );

        for (color, count) in [
            (items.pass, self.items.passed),
            (items.warn, self.items.warned),
            (items.fail, self.items.failed),
            (items.thrown, self.items.thrown),
            ("white", self.items.total),
            (cases.pass, self.cases.passed),
            (cases.warn, self.cases.warned),
            (cases.fail, self.cases.failed),
            (cases.thrown, self.cases.thrown),
        ] {
            let _ = writeln!(row, "<td>{}</td>", colored(color, count));
        }
        let _ = writeln!(row, "<td>{}</td></tr>", colored("white", self.cases.total));

        row
    }

    fn update_main_page(&self) -> anyhow::Result<()> {
        let (Some(round), Some(page)) = (&self.round, self.file.path()) else {
            return Ok(());
        };

        let main_page = round::main_page_path(&self.partial);
        let row = self.history_row(round, page);

        let existing = std::fs::read_to_string(&main_page).ok();
        let content = existing
            .as_deref()
            .and_then(|content| splice_history(content, &row))
            .unwrap_or_else(|| fresh_main_page(&row));

        std::fs::write(&main_page, content)
            .with_context(|| format!("failed to write {}", main_page.display()))?;

        tracing::debug!(
            target: trace_categories::OUTPUT,
            "updated main page {}",
            main_page.display()
        );
        Ok(())
    }

    fn finish_page(&mut self) -> anyhow::Result<()> {
        if self.file.is_open() {
            self.file.write_str(LEGEND)?;
            self.file.write_str(PAGE_END)?;
            self.file.close()?;
        }
        Ok(())
    }
}

/// Inserts `row` as the newest history row, keeping at most [`MAX_HISTORY_ROWS`] rows.
///
/// Returns `None` if `content` doesn't look like a main page.
fn splice_history(content: &str, row: &str) -> Option<String> {
    let header = content.find("<tr>")?;
    let first_row = header + 1 + content[header + 1..].find("<tr>")?;
    let table_end = first_row + content[first_row..].find("</table>")?;

    let old_rows = &content[first_row..table_end];
    let kept = old_rows
        .match_indices("<tr>")
        .nth(MAX_HISTORY_ROWS - 1)
        .map_or(old_rows, |(cut, _)| &old_rows[..cut]);

    let mut spliced = String::with_capacity(content.len() + row.len());
    spliced.push_str(&content[..first_row]);
    spliced.push_str(row);
    spliced.push_str(kept);
    spliced.push_str(&content[table_end..]);
    Some(spliced)
}

fn fresh_main_page(row: &str) -> String {
    let mut page = String::new();
    page.push_str(PAGE_HEAD);
    page.push_str("<body bgcolor=black text=white>\n");
    page.push_str(TABLE_OPEN);
    page.push_str(TABLE_CAPTION);
    page.push_str(HISTORY_HEADER);
    page.push_str(row);
    page.push_str("</table><br>\n");
    page.push_str(LEGEND);
    page.push_str(PAGE_END);
    page
}

fn totals_row(title: &str, totals: &Totals) -> String {
    let colors = ResultColors::new(totals);
    format!(
        "<tr><th>{}</th><th>-</th><th>{title}</th>\
         <th>{}</th><th>{}</th><th>{}</th><th>{}</th><th>{}</th></tr>\n",
        colored(colors.overall, colors.label),
        colored(colors.pass, totals.passed),
        colored(colors.warn, totals.warned),
        colored(colors.fail, totals.failed),
        colored(colors.thrown, totals.thrown),
        totals.total
    )
}

impl ResultReceiver for HtmlReceiver {
    fn on_start(&mut self, round: &RoundStart) -> ReceiverResult {
        self.finish_page()?;

        let path = round.file_name(&self.partial, ".html");
        self.file
            .open(path.clone())
            .with_context(|| format!("failed to open {}", path.display()))?;

        self.round = Some(round.clone());
        self.items = Totals::default();
        self.cases = Totals::default();

        let main_link = round::relative_link(&round::main_page_path(&self.partial));
        let text = format!(
            "{PAGE_HEAD}\n<body bgcolor=black text=white>\n\
             <a href='{}'>Unit Test Main Page</a><br>\n\
             Name of Unit Tests: {}<br>\n",
            escape_markup(&main_link),
            escape_markup(round.name())
        );
        self.emit(&text)
    }

    fn on_message(&mut self, case: &TestCase, site: &Site<'_>, message: &str) -> ReceiverResult {
        let mut text = format!("{}({}) : ", escape_markup(site.file), site.line);
        if self.indexes {
            let _ = write!(text, "{} ", case.index());
        }
        let _ = writeln!(text, "{}<br>", escape_markup(message));
        self.emit(&text)
    }

    fn on_case_header(&mut self, case: &TestCase) -> ReceiverResult {
        let text = format!(
            "<br>Test Number: {}  {}<br>\n",
            case.index(),
            escape_markup(case.name().as_str())
        );
        self.emit(&text)
    }

    fn on_result_line(&mut self, case: &TestCase, line: &ResultLine<'_>) -> ReceiverResult {
        let text = self.format_line(case, line);
        self.emit(&text)
    }

    fn on_timestamp(&mut self, is_start: bool, stamp: &str) -> ReceiverResult {
        let text = if is_start {
            format!("<br>\n{BEGAN_AT}{}<br>\n", escape_markup(stamp))
        } else {
            format!("{ENDED_AT}{}<br>\n", escape_markup(stamp))
        };
        self.emit(&text)
    }

    fn on_summary_start(&mut self) -> ReceiverResult {
        let text = format!(
            "\n{TABLE_OPEN}{TABLE_CAPTION}\
             <tr><th>Result</th><th>#</th><th>Unit Test Name</th>\
             <th>Passed</th><th>Warnings</th><th>Failed</th>\
             <th>Exceptions</th><th>Tested</th></tr>\n"
        );
        self.emit(&text)
    }

    fn on_table_row(&mut self, case: &TestCase) -> ReceiverResult {
        let colors = ResultColors::new(&case.totals());
        let text = format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td>\
             <th>{}</th><th>{}</th><th>{}</th><th>{}</th><th>{}</th></tr>\n",
            colored(colors.overall, colors.label),
            case.index(),
            escape_markup(case.name().as_str()),
            colored(colors.pass, case.passed()),
            colored(colors.warn, case.warned()),
            colored(colors.fail, case.failed()),
            colored(colors.thrown, case.thrown()),
            case.items()
        );
        self.emit(&text)
    }

    fn on_totals_line(&mut self, totals: &Totals) -> ReceiverResult {
        self.items = *totals;
        self.emit(&totals_row("Item Totals", totals))
    }

    fn on_summary_line(&mut self, totals: &Totals) -> ReceiverResult {
        self.cases = *totals;
        let mut text = totals_row("Unit Test Results", totals);
        text.push_str("</table><br>\n");
        self.emit(&text)
    }

    fn on_summary_end(&mut self) -> ReceiverResult {
        if !self.file.is_open() {
            return Ok(false);
        }

        if let Err(e) = self.update_main_page() {
            tracing::warn!(target: trace_categories::OUTPUT, "{e:#}");
        }

        self.finish_page()?;
        Ok(true)
    }

    fn on_final_teardown(&mut self) {
        if let Err(e) = self.finish_page() {
            tracing::warn!(target: trace_categories::OUTPUT, "failed to finish HTML page: {e:#}");
        }
    }
}
