//! Per-round naming: timestamps and output file names.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

const TIMESTAMP_FORMAT_ABBREVIATED: &str = "%a, %Y %b %d at %H:%M:%S in %z";
const TIMESTAMP_FORMAT_FULL: &str = "%A, %Y %b %d at %H:%M:%S in %z";
const HISTORY_FORMAT_ABBREVIATED: &str = "%a, %Y - %B - %d, %H : %M : %S";
const HISTORY_FORMAT_FULL: &str = "%A, %Y - %B - %d, %H : %M : %S";
const FILE_SUFFIX_FORMAT: &str = "_%Y_%m_%d_%H_%M_%S";

/// Prefix of the start timestamp line.
pub const BEGAN_AT: &str = "Unit Tests Began at: ";
/// Prefix of the stop timestamp line.
pub const ENDED_AT: &str = "Unit Tests Ended at: ";

/// Information handed to receivers when a round begins.
#[derive(Clone, Debug)]
pub struct RoundStart {
    name: String,
    started_at: DateTime<Local>,
    full_day_name: bool,
}

impl RoundStart {
    pub(crate) const fn new(name: String, started_at: DateTime<Local>, full_day_name: bool) -> Self {
        Self {
            name,
            started_at,
            full_day_name,
        }
    }

    /// Name of the test run.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// When the round started.
    pub const fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Whether timestamps spell out the weekday.
    pub const fn full_day_name(&self) -> bool {
        self.full_day_name
    }

    /// The start time rendered as a timestamp line value.
    pub fn timestamp(&self) -> String {
        format_timestamp(&self.started_at, self.full_day_name)
    }

    /// The start time rendered for the HTML history table.
    pub fn history_stamp(&self) -> String {
        let format = if self.full_day_name {
            HISTORY_FORMAT_FULL
        } else {
            HISTORY_FORMAT_ABBREVIATED
        };
        self.started_at.format(format).to_string()
    }

    /// Output file name for this round: `partial` + `_YYYY_MM_DD_HH_MM_SS` + `extension`.
    pub fn file_name(&self, partial: &Path, extension: &str) -> PathBuf {
        let mut name = OsString::from(partial.as_os_str());
        name.push(self.started_at.format(FILE_SUFFIX_FORMAT).to_string());
        name.push(extension);
        PathBuf::from(name)
    }
}

/// Renders a time as used on timestamp lines.
pub fn format_timestamp(at: &DateTime<Local>, full_day_name: bool) -> String {
    let format = if full_day_name {
        TIMESTAMP_FORMAT_FULL
    } else {
        TIMESTAMP_FORMAT_ABBREVIATED
    };
    at.format(format).to_string()
}

/// Path of the HTML history page for a partial path.
pub fn main_page_path(partial: &Path) -> PathBuf {
    let mut name = OsString::from(partial.as_os_str());
    name.push(".html");
    PathBuf::from(name)
}

/// Relative link (`./name`) to a file that lives next to the linking page.
pub fn relative_link(path: &Path) -> String {
    let full = path.to_string_lossy();
    let file = full
        .rsplit([':', '/', '\\'])
        .next()
        .unwrap_or_default();
    format!("./{file}")
}
