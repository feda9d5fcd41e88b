//! Built-in receivers that write results to files and standard streams.

mod html;
mod junit;
mod text;
mod xml;

pub use html::{HtmlReceiver, MAX_HISTORY_ROWS};
pub use junit::JunitReceiver;
pub use text::TextReceiver;
pub use xml::XmlReceiver;

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::trace_categories;

/// An output file that is opened (truncated) per round and closed at round end.
#[derive(Default)]
pub(crate) struct FileSink {
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    pub fn open(&mut self, path: PathBuf) -> std::io::Result<()> {
        self.close()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(&path)?;
        tracing::debug!(target: trace_categories::OUTPUT, "opened {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.path = Some(path);
        Ok(())
    }

    pub const fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Path of the most recently opened file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn write_str(&mut self, s: &str) -> std::io::Result<()> {
        if let Some(writer) = &mut self.writer {
            writer.write_all(s.as_bytes())?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(writer) = &mut self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    pub fn close(&mut self) -> std::io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            if let Some(path) = &self.path {
                tracing::debug!(target: trace_categories::OUTPUT, "closed {}", path.display());
            }
        }
        Ok(())
    }
}

/// Escapes text for use in HTML or XML content and double-quoted attribute values.
pub(crate) fn escape_markup(s: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(s)
}
