//! `key: value` line parser
//!
//! Parses a single line of the form
//!
//! ```text
//! <key><separator><optional whitespace><value>
//! ```
//!
//! resolves the key, converts the value according to the entry's declared
//! type, and commits it through [`ConfigTable::set_by_idx`]. A line is either
//! applied completely or not at all.
//!
//! Value conventions:
//! - Integers and floats must be a complete decimal literal of the target
//!   type. Out-of-range literals are rejected rather than clamped.
//! - Strings may be wrapped in double quotes, which are stripped.
//! - Booleans look only at the first character: `T`/`t`/`1` or `F`/`f`/`0`.

use crate::entry::ValueType;
use crate::error::CfgError;
use crate::table::ConfigTable;

/// Default key/value separator
pub const DEFAULT_SEPARATOR: char = ':';

/// Line parser settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KvParser {
    separator: char,
    strip_quotes: bool,
}

impl Default for KvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl KvParser {
    /// Parser with `:` separator and quote stripping enabled
    pub const fn new() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            strip_quotes: true,
        }
    }

    /// Use a different key/value separator
    pub const fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Enable or disable stripping of `"` around string values
    ///
    /// When disabled, quotes are stored as part of the string.
    pub const fn with_quote_stripping(mut self, strip_quotes: bool) -> Self {
        self.strip_quotes = strip_quotes;
        self
    }

    /// Configured separator
    pub const fn separator(&self) -> char {
        self.separator
    }

    /// Whether quotes around string values are stripped
    pub const fn strips_quotes(&self) -> bool {
        self.strip_quotes
    }

    /// Parse one `key: value` line and write the value into `table`
    ///
    /// Returns the index of the updated entry.
    ///
    /// # Errors
    /// - [`CfgError::FormatError`] if the separator is missing or a quoted
    ///   string is not terminated
    /// - [`CfgError::UnknownKey`] if no entry has the key
    /// - [`CfgError::Error`] if the value cannot be converted to the entry's
    ///   type, or the entry has no type
    /// - [`CfgError::TooLarge`] if a string does not fit the entry
    pub fn parse<const N: usize>(
        &self,
        table: &mut ConfigTable<'_, N>,
        line: &str,
    ) -> Result<usize, CfgError> {
        let (key, value) = line
            .split_once(self.separator)
            .ok_or(CfgError::FormatError)?;
        let idx = table.resolve(key).ok_or(CfgError::UnknownKey)?;

        let value = value
            .trim_start_matches(is_space)
            .trim_end_matches(is_line_end);

        match table.get_by_idx(idx)?.value_type() {
            ValueType::UInt32 => {
                let v: u32 = parse_int(value)?;
                table.set_by_idx(idx, &v.to_ne_bytes())?;
            }
            ValueType::Int32 => {
                let v: i32 = parse_int(value)?;
                table.set_by_idx(idx, &v.to_ne_bytes())?;
            }
            ValueType::Float => {
                let v = parse_float(value)?;
                table.set_by_idx(idx, &v.to_ne_bytes())?;
            }
            ValueType::String => {
                let v = self.parse_string(value)?;
                table.set_by_idx(idx, v.as_bytes())?;
            }
            ValueType::Bool => {
                let v = parse_bool(value)?;
                table.set_by_idx(idx, &[u8::from(v)])?;
            }
            ValueType::None => return Err(CfgError::Error),
        }

        Ok(idx)
    }

    fn parse_string<'s>(&self, value: &'s str) -> Result<&'s str, CfgError> {
        if !self.strip_quotes {
            return Ok(value);
        }
        match value.strip_prefix('"') {
            Some(inner) => inner.strip_suffix('"').ok_or(CfgError::FormatError),
            None => Ok(value),
        }
    }
}

/// Whitespace as understood by C `isspace` in the "C" locale
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0b' | '\x0c' | '\r')
}

fn is_line_end(c: char) -> bool {
    matches!(c, '\0' | '\r' | '\n')
}

fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, CfgError> {
    value
        .trim_end_matches(is_space)
        .parse()
        .map_err(|_| CfgError::Error)
}

/// Parse a float, rejecting literals outside the range of `f32`
///
/// `str::parse` saturates instead of failing: overflow yields infinity and
/// underflow yields zero. Both are reported as errors unless the literal
/// itself spells infinity or zero.
fn parse_float(value: &str) -> Result<f32, CfgError> {
    let value = value.trim_end_matches(is_space);
    let v: f32 = value.parse().map_err(|_| CfgError::Error)?;

    if v.is_infinite() && !spells_infinity(value) {
        return Err(CfgError::Error);
    }
    if v == 0.0 && has_nonzero_mantissa(value) {
        return Err(CfgError::Error);
    }
    Ok(v)
}

fn spells_infinity(value: &str) -> bool {
    let unsigned = value.trim_start_matches(['+', '-']);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

fn has_nonzero_mantissa(value: &str) -> bool {
    value
        .chars()
        .take_while(|c| !matches!(c, 'e' | 'E'))
        .any(|c| matches!(c, '1'..='9'))
}

fn parse_bool(value: &str) -> Result<bool, CfgError> {
    match value.as_bytes().first() {
        Some(b'T' | b't' | b'1') => Ok(true),
        Some(b'F' | b'f' | b'0') => Ok(false),
        _ => Err(CfgError::Error),
    }
}
