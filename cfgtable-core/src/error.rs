//! Status codes returned by table and parser operations

use core::fmt;

/// Errors returned by [`ConfigTable`](crate::ConfigTable) and
/// [`KvParser`](crate::KvParser) operations
///
/// Every operation validates presence first, then key or index resolution,
/// then type and size, and reports the first failure without touching
/// storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CfgError {
    /// Unspecified failure (unparseable or out-of-range value, invalid bool)
    Error,
    /// No entry with the requested key
    UnknownKey,
    /// The value does not fit into the entry's storage
    TooLarge,
    /// Index is not below the entry count
    OutOfRange,
    /// A required input was empty
    NullInput,
    /// The entry's declared type differs from the requested one
    TypeMismatch,
    /// Line has no key/value separator, or a quoted value is unterminated
    FormatError,
    /// Two entries share a key
    DuplicateKey,
    /// Key contains a separator, whitespace or control character, or starts
    /// with `#`
    InvalidKey,
}

impl fmt::Display for CfgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            CfgError::Error => "invalid value",
            CfgError::UnknownKey => "unknown key",
            CfgError::TooLarge => "value too large for entry storage",
            CfgError::OutOfRange => "index out of range",
            CfgError::NullInput => "empty input",
            CfgError::TypeMismatch => "type mismatch",
            CfgError::FormatError => "malformed key/value line",
            CfgError::DuplicateKey => "duplicate key",
            CfgError::InvalidKey => "key cannot appear in a key/value line",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for CfgError {}
