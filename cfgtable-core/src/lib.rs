//! Typed configuration registry for firmware-style applications
//!
//! A [`ConfigTable`] is a fixed, ordered set of named configuration values
//! whose storage is owned by the application. The table only borrows that
//! storage and provides:
//!
//! - Key to index resolution
//! - Bounds-checked generic byte reads and writes
//! - Type-checked accessors per scalar kind and for strings
//! - A `key: value` line parser that applies validated, typed writes
//! - Multi-line text loading and writing built on the line parser
//!
//! # Example
//!
//! ```
//! use cfgtable_core::{ConfigTable, Entry, KvParser};
//!
//! let mut baud_rate: u32 = 115_200;
//! let mut ssid = [0u8; 32];
//!
//! let mut table = ConfigTable::new([
//!     Entry::uint32("baud_rate", &mut baud_rate),
//!     Entry::string("wifi.ssid", &mut ssid),
//! ])
//! .unwrap();
//!
//! KvParser::new().parse(&mut table, "baud_rate: 9600").unwrap();
//! KvParser::new().parse(&mut table, "wifi.ssid: \"workshop\"").unwrap();
//!
//! assert_eq!(table.get_u32_by_key("baud_rate"), Ok(9600));
//! assert_eq!(table.get_str_by_key("wifi.ssid"), Ok("workshop"));
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod entry;
pub mod error;
pub mod parse;
pub mod table;
pub mod text;

pub use entry::{Entry, RawValue, Value, ValueType};
pub use error::CfgError;
pub use parse::{KvParser, DEFAULT_SEPARATOR};
pub use table::ConfigTable;
pub use text::{LineError, TextReport};
