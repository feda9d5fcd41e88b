use clap::{Parser, builder::styling};
use std::path::PathBuf;

use crate::{events, productinfo};

const SHORT_DESCRIPTION: &str = "Runs the sample Thingy suites through the verdict harness";

const LONG_DESCRIPTION: &str = r"
verdict-demo exercises the verdict unit-test harness end to end: it records
passing, warning, failing, and panicking assertions across a handful of sample
suites and reports them to the configured destinations.

Output options are given as a string of letters:
  n  No extra output options. Incompatible with any other output option.
  f  Use full weekday names, not abbreviations.
  h  Show headers for each unit test that fails.
  i  Show test index in each unit test output line.
  m  Show messages even if no test with message.
  p  Show contents of passing tests.
  t  Show beginning and ending timestamps.
  T  Show summary table once tests are done.
  w  Show failing warnings.
  d  Show divider lines in table and sections.
  D  Show default output options (same as hmtTw plus dividers).
  E  Send test results to standard error.
  S  Send test results to standard output.

Settings may also come from a TOML configuration file; command-line arguments
take precedence.
";

/// Parsed command-line arguments for the demo.
#[derive(Debug, Parser)]
#[clap(name = productinfo::PRODUCT_NAME,
       version = productinfo::PRODUCT_VERSION,
       about = SHORT_DESCRIPTION,
       long_about = LONG_DESCRIPTION,
       styles = help_styles())]
pub struct CommandLineArgs {
    /// Run the fatal suite, which ends the program abruptly.
    #[clap(short = 'f', long = "fatal", conflicts_with_all = ["passing_only", "no_tests"])]
    pub fatal: bool,

    /// Run only the passing suites.
    #[clap(short = 'p', long = "passing-only", conflicts_with = "no_tests")]
    pub passing_only: bool,

    /// Run no suites; just make the summary table.
    #[clap(short = 'z', long = "no-tests", conflicts_with = "repeat")]
    pub no_tests: bool,

    /// Watch every failure and exit with an error if any case failed.
    #[clap(short = 'a', long = "strict")]
    pub strict: bool,

    /// Don't flush the summary when the registry is dropped.
    #[clap(short = 'L', long = "keep-alive")]
    pub keep_alive: bool,

    /// Leave the summary table to program exit.
    #[clap(short = 'e', long = "table-at-exit")]
    pub table_at_exit: bool,

    /// Flush the summary, then run the suites again.
    #[clap(short = 'r', long = "repeat")]
    pub repeat: bool,

    /// Output options, as a string of letters.
    #[clap(short = 'o', long = "output", value_name = "LETTERS")]
    pub output_options: Option<String>,

    /// Send results to text files starting with this partial path.
    #[clap(short = 't', long = "text", value_name = "PARTIAL")]
    pub text_file: Option<PathBuf>,

    /// Send results to HTML files starting with this partial path.
    #[clap(long = "html", value_name = "PARTIAL")]
    pub html_file: Option<PathBuf>,

    /// Send results to XML files starting with this partial path.
    #[clap(short = 'x', long = "xml", value_name = "PARTIAL")]
    pub xml_file: Option<PathBuf>,

    /// Send results to JUnit XML files starting with this partial path.
    #[clap(short = 'j', long = "junit", value_name = "PARTIAL")]
    pub junit_file: Option<PathBuf>,

    /// Name of the test run.
    #[clap(long = "name", env = "VERDICT_RUN_NAME")]
    pub name: Option<String>,

    /// Path to a configuration file.
    #[clap(long = "config", value_name = "FILE", conflicts_with = "no_config")]
    pub config_file: Option<PathBuf>,

    /// Don't load any configuration file.
    #[clap(long = "no-config")]
    pub no_config: bool,

    /// Enable debug logging for classes of tracing events.
    #[clap(long = "log", value_name = "EVENT")]
    pub enabled_log_events: Vec<events::TraceEvent>,
}

/// Returns clap styling to be used for command-line help.
#[doc(hidden)]
fn help_styles() -> clap::builder::Styles {
    styling::Styles::styled()
        .header(
            styling::AnsiColor::Yellow.on_default()
                | styling::Effects::BOLD
                | styling::Effects::UNDERLINE,
        )
        .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .literal(styling::AnsiColor::Magenta.on_default() | styling::Effects::BOLD)
        .placeholder(styling::AnsiColor::Cyan.on_default())
}
