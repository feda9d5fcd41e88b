//! Output options and registry configuration.

use std::ops::{BitOr, BitOrAssign};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Error;

/// Name used for a registry configured with an empty name.
pub const DEFAULT_REGISTRY_NAME: &str = "Unit Tests";

/// Set of flags controlling what the registry broadcasts and where the
/// built-in text writer sends its output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutputOptions(u16);

impl OutputOptions {
    /// No optional output.
    pub const NOTHING: Self = Self(0x0000);
    /// Show passing items.
    pub const PASSES: Self = Self(0x0001);
    /// Show failing warning-level items.
    pub const WARNINGS: Self = Self(0x0002);
    /// Show a header before the first output line of each case.
    pub const HEADERS: Self = Self(0x0004);
    /// Show messages.
    pub const MESSAGES: Self = Self(0x0008);
    /// Show start and stop timestamps.
    pub const TIMESTAMP: Self = Self(0x0010);
    /// Use full weekday names in timestamps.
    pub const FULL_DAY_NAME: Self = Self(0x0020);
    /// Show divider lines in the text output.
    pub const DIVIDERS: Self = Self(0x0040);
    /// Show the case index on each output line.
    pub const ADD_TEST_INDEX: Self = Self(0x0080);
    /// Show the summary table at flush time.
    pub const SUMMARY_TABLE: Self = Self(0x0100);
    /// Send text output to standard output.
    pub const SEND_TO_STDOUT: Self = Self(0x4000);
    /// Send text output to standard error.
    pub const SEND_TO_STDERR: Self = Self(0x8000);
    /// Warnings, headers, messages, timestamps, dividers, and the summary table.
    pub const DEFAULT: Self = Self(0x015E);

    /// Constructs options from raw bits.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Returns true if every flag in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Returns true if no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Sets the flags in `other`.
    pub const fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears the flags in `other`.
    pub const fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Returns a copy with the flags in `other` set.
    #[must_use]
    pub const fn with(mut self, other: Self) -> Self {
        self.insert(other);
        self
    }
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl BitOr for OutputOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for OutputOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl FromStr for OutputOptions {
    type Err = Error;

    /// Parses a string of option letters.
    ///
    /// | letter | meaning |
    /// |--------|---------|
    /// | `D` | default set (may be combined with others) |
    /// | `d` | divider lines |
    /// | `E` | send text to standard error |
    /// | `S` | send text to standard output |
    /// | `f` | full weekday names |
    /// | `i` | case index on each line |
    /// | `n` | nothing; can't be combined with any of `tdpmhw` |
    /// | `h` | case headers |
    /// | `m` | messages |
    /// | `p` | passing items |
    /// | `t` | timestamps |
    /// | `T` | summary table |
    /// | `w` | warnings |
    ///
    /// When none of `tdpmhw` is given (and `n` isn't either), the default set
    /// is included.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut seen: Vec<char> = vec![];
        let mut options = Self::NOTHING;
        let mut use_default = false;
        let mut show_nothing = false;

        for c in s.chars() {
            if seen.contains(&c) {
                return Err(Error::DuplicateOutputOption(c));
            }
            seen.push(c);

            match c {
                'D' => use_default = true,
                'n' => show_nothing = true,
                'd' => options |= Self::DIVIDERS,
                'E' => options |= Self::SEND_TO_STDERR,
                'S' => options |= Self::SEND_TO_STDOUT,
                'f' => options |= Self::FULL_DAY_NAME,
                'i' => options |= Self::ADD_TEST_INDEX,
                'h' => options |= Self::HEADERS,
                'm' => options |= Self::MESSAGES,
                'p' => options |= Self::PASSES,
                't' => options |= Self::TIMESTAMP,
                'T' => options |= Self::SUMMARY_TABLE,
                'w' => options |= Self::WARNINGS,
                _ => return Err(Error::InvalidOutputOption(c)),
            }
        }

        let content = Self::TIMESTAMP
            | Self::DIVIDERS
            | Self::PASSES
            | Self::MESSAGES
            | Self::HEADERS
            | Self::WARNINGS;
        let has_content = (options.0 & content.0) != 0;

        if show_nothing && has_content {
            return Err(Error::ConflictingOutputOptions);
        }
        if !has_content && !show_nothing {
            use_default = true;
        }
        if use_default {
            options |= Self::DEFAULT;
        }

        Ok(options)
    }
}

/// What to do once a required assertion has failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FatalAction {
    /// Terminate the process with the given exit code.
    Exit(i32),
    /// Unwind with a [`FatalFailure`](crate::FatalFailure) payload.
    Panic,
}

impl Default for FatalAction {
    fn default() -> Self {
        Self::Exit(1)
    }
}

/// Behavior of the fatal path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FatalPolicy {
    /// Flush the summary before acting.
    pub flush_summary: bool,
    /// How to end the run.
    pub action: FatalAction,
}

impl Default for FatalPolicy {
    fn default() -> Self {
        Self {
            flush_summary: true,
            action: FatalAction::default(),
        }
    }
}

/// Configuration for a [`TestRegistry`](crate::TestRegistry).
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// Name of the test run.
    pub name: String,
    /// Partial path for text output files.
    pub text_path: Option<PathBuf>,
    /// Partial path for HTML output files and the main page.
    pub html_path: Option<PathBuf>,
    /// Partial path for XML output files.
    pub xml_path: Option<PathBuf>,
    /// Partial path for JUnit XML output files.
    pub junit_path: Option<PathBuf>,
    /// Output options.
    pub options: OutputOptions,
    /// Fatal path behavior.
    pub fatal: FatalPolicy,
    /// Whether dropping the registry flushes the summary.
    pub summary_on_drop: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_NAME)
    }
}

impl RegistryConfig {
    /// Creates a configuration with default options and no file output.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: if name.is_empty() {
                DEFAULT_REGISTRY_NAME.to_owned()
            } else {
                name
            },
            text_path: None,
            html_path: None,
            xml_path: None,
            junit_path: None,
            options: OutputOptions::DEFAULT,
            fatal: FatalPolicy::default(),
            summary_on_drop: true,
        }
    }

    /// Sends text output to files starting with the given partial path.
    #[must_use]
    pub fn with_text_file(mut self, partial: impl AsRef<Path>) -> Self {
        self.text_path = non_empty_path(partial.as_ref());
        self
    }

    /// Sends HTML output to files starting with the given partial path.
    #[must_use]
    pub fn with_html_file(mut self, partial: impl AsRef<Path>) -> Self {
        self.html_path = non_empty_path(partial.as_ref());
        self
    }

    /// Sends XML output to files starting with the given partial path.
    #[must_use]
    pub fn with_xml_file(mut self, partial: impl AsRef<Path>) -> Self {
        self.xml_path = non_empty_path(partial.as_ref());
        self
    }

    /// Sends JUnit XML output to files starting with the given partial path.
    #[must_use]
    pub fn with_junit_file(mut self, partial: impl AsRef<Path>) -> Self {
        self.junit_path = non_empty_path(partial.as_ref());
        self
    }

    /// Sets the output options.
    #[must_use]
    pub const fn with_options(mut self, options: OutputOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the fatal path behavior.
    #[must_use]
    pub const fn with_fatal_policy(mut self, fatal: FatalPolicy) -> Self {
        self.fatal = fatal;
        self
    }

    /// Controls whether dropping the registry flushes the summary.
    #[must_use]
    pub const fn with_summary_on_drop(mut self, enabled: bool) -> Self {
        self.summary_on_drop = enabled;
        self
    }

    /// True if some output destination is configured.
    pub fn has_any_output(&self) -> bool {
        self.text_path.is_some()
            || self.html_path.is_some()
            || self.xml_path.is_some()
            || self.junit_path.is_some()
            || self.options.contains(OutputOptions::SEND_TO_STDOUT)
            || self.options.contains(OutputOptions::SEND_TO_STDERR)
    }
}

fn non_empty_path(path: &Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_bits() {
        assert_eq!(
            OutputOptions::DEFAULT,
            OutputOptions::WARNINGS
                | OutputOptions::HEADERS
                | OutputOptions::MESSAGES
                | OutputOptions::TIMESTAMP
                | OutputOptions::DIVIDERS
                | OutputOptions::SUMMARY_TABLE
        );
    }

    #[test]
    fn contains_requires_every_flag() {
        let opts = OutputOptions::HEADERS | OutputOptions::PASSES;
        assert!(opts.contains(OutputOptions::HEADERS));
        assert!(opts.contains(OutputOptions::HEADERS | OutputOptions::PASSES));
        assert!(!opts.contains(OutputOptions::HEADERS | OutputOptions::WARNINGS));
        assert!(opts.contains(OutputOptions::NOTHING));
    }

    #[test]
    fn parse_empty_is_default() -> Result<(), Error> {
        assert_eq!("".parse::<OutputOptions>()?, OutputOptions::DEFAULT);
        assert_eq!(
            "S".parse::<OutputOptions>()?,
            OutputOptions::DEFAULT | OutputOptions::SEND_TO_STDOUT
        );
        Ok(())
    }

    #[test]
    fn parse_explicit_letters() -> Result<(), Error> {
        assert_eq!(
            "hpT".parse::<OutputOptions>()?,
            OutputOptions::HEADERS | OutputOptions::PASSES | OutputOptions::SUMMARY_TABLE
        );
        assert_eq!(
            "Dp".parse::<OutputOptions>()?,
            OutputOptions::DEFAULT | OutputOptions::PASSES
        );
        assert_eq!("nS".parse::<OutputOptions>()?, OutputOptions::SEND_TO_STDOUT);
        Ok(())
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            "hh".parse::<OutputOptions>(),
            Err(Error::DuplicateOutputOption('h'))
        ));
        assert!(matches!(
            "hx".parse::<OutputOptions>(),
            Err(Error::InvalidOutputOption('x'))
        ));
        assert!(matches!(
            "nh".parse::<OutputOptions>(),
            Err(Error::ConflictingOutputOptions)
        ));
    }

    #[test]
    fn empty_name_uses_default() {
        assert_eq!(RegistryConfig::new("").name, DEFAULT_REGISTRY_NAME);
    }

    #[test]
    fn output_detection() {
        let config = RegistryConfig::new("x").with_options(OutputOptions::DEFAULT);
        assert!(!config.has_any_output());
        assert!(config.clone().with_xml_file("out/x").has_any_output());
        assert!(!config.clone().with_xml_file("").has_any_output());
        assert!(
            config
                .with_options(OutputOptions::SEND_TO_STDERR)
                .has_any_output()
        );
    }
}
