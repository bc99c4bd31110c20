//! Multi-line configuration text
//!
//! Applies a block of `key: value` lines to a table and writes a table back
//! out in the same format. Blank lines and lines starting with `#` are
//! ignored. A bad line is counted and skipped; it does not stop the lines
//! after it.

use core::fmt::{self, Write};

use heapless::String;

use crate::entry::{Entry, Value};
use crate::error::CfgError;
use crate::parse::KvParser;
use crate::table::ConfigTable;

/// A rejected line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineError {
    /// 1-based line number
    pub line: usize,
    /// Why the line was rejected
    pub error: CfgError,
}

/// Outcome of [`KvParser::apply_text`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TextReport {
    /// Lines written into the table
    pub applied: usize,
    /// Lines that failed to parse or apply
    pub rejected: usize,
    /// First rejected line, if any
    pub first_error: Option<LineError>,
}

impl TextReport {
    /// Check if every non-comment line was applied
    pub fn is_clean(&self) -> bool {
        self.rejected == 0
    }
}

impl KvParser {
    /// Apply every `key: value` line of `text` to `table`
    pub fn apply_text<const N: usize>(
        &self,
        table: &mut ConfigTable<'_, N>,
        text: &str,
    ) -> TextReport {
        let mut report = TextReport::default();

        for (n, line) in text.lines().enumerate() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match self.parse(table, line) {
                Ok(_) => report.applied += 1,
                Err(error) => {
                    report.rejected += 1;
                    if report.first_error.is_none() {
                        report.first_error = Some(LineError { line: n + 1, error });
                    }
                }
            }
        }

        report
    }

    /// Write one entry as a `key: value` line
    ///
    /// Strings are quoted when quote stripping is enabled so that leading
    /// and trailing whitespace survive a reload. Untyped entries produce no
    /// output. Nothing is written for an entry that would not read back as
    /// the same single line; see [`to_text`](Self::to_text).
    pub fn write_entry<W: Write>(&self, entry: &Entry<'_>, out: &mut W) -> fmt::Result {
        self.check_line(entry).map_err(|_| fmt::Error)?;

        let key = entry.key();
        let sep = self.separator();
        match entry.value() {
            Value::None => Ok(()),
            Value::Str(s) if self.strips_quotes() => writeln!(out, "{}{} \"{}\"", key, sep, s),
            value => writeln!(out, "{}{} {}", key, sep, value),
        }
    }

    /// Write every entry of `table`, in index order
    pub fn write_table<W: Write, const N: usize>(
        &self,
        table: &ConfigTable<'_, N>,
        out: &mut W,
    ) -> fmt::Result {
        for entry in table {
            self.write_entry(entry, out)?;
        }
        Ok(())
    }

    /// Render `table` into a fixed-capacity string
    ///
    /// # Errors
    /// - [`CfgError::InvalidKey`] if a key contains the separator
    /// - [`CfgError::FormatError`] if a string holds a line break, or has
    ///   leading or trailing whitespace while quoting is disabled
    /// - [`CfgError::TooLarge`] if the text exceeds `CAP` bytes
    pub fn to_text<const CAP: usize, const N: usize>(
        &self,
        table: &ConfigTable<'_, N>,
    ) -> Result<String<CAP>, CfgError> {
        for entry in table {
            self.check_line(entry)?;
        }

        let mut text = String::new();
        self.write_table(table, &mut text)
            .map_err(|_| CfgError::TooLarge)?;
        Ok(text)
    }

    /// Check that `entry` renders to one line that parses back to its value
    fn check_line(&self, entry: &Entry<'_>) -> Result<(), CfgError> {
        let value = entry.value();
        if matches!(value, Value::None) {
            return Ok(());
        }
        if entry.key().contains(self.separator()) {
            return Err(CfgError::InvalidKey);
        }
        if let Value::Str(s) = value {
            if s.contains(|c| matches!(c, '\r' | '\n')) {
                return Err(CfgError::FormatError);
            }
            // Unquoted values lose surrounding whitespace on reload
            if !self.strips_quotes() && s.trim() != s {
                return Err(CfgError::FormatError);
            }
        }
        Ok(())
    }
}
