//! Entry descriptors
//!
//! An [`Entry`] names one configuration value and borrows the storage the
//! application owns for it. The kind of value is encoded by which storage
//! variant the entry holds, so the type tag can never disagree with the
//! storage it describes.

use core::fmt;
use core::ops::Deref;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::CfgError;

/// Width of the inline buffer used for scalar raw values
pub const SCALAR_WIDTH: usize = 4;

/// Declared type of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum ValueType {
    /// Placeholder entry without storage
    None = 0,
    /// Unsigned 32-bit integer
    UInt32 = 1,
    /// Signed 32-bit integer
    Int32 = 2,
    /// 32-bit IEEE-754 float
    Float = 3,
    /// NUL-terminated string in a fixed-capacity buffer
    String = 4,
    /// Boolean stored as a single byte
    Bool = 5,
}

impl ValueType {
    /// Get the type tag as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a type tag from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ValueType::None),
            1 => Some(ValueType::UInt32),
            2 => Some(ValueType::Int32),
            3 => Some(ValueType::Float),
            4 => Some(ValueType::String),
            5 => Some(ValueType::Bool),
            _ => None,
        }
    }

    /// Short lowercase name, used in diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            ValueType::None => "none",
            ValueType::UInt32 => "u32",
            ValueType::Int32 => "i32",
            ValueType::Float => "f32",
            ValueType::String => "string",
            ValueType::Bool => "bool",
        }
    }
}

/// Borrowed storage of one entry
#[derive(Debug)]
enum Slot<'a> {
    UInt32(&'a mut u32),
    Int32(&'a mut i32),
    Float(&'a mut f32),
    Bool(&'a mut bool),
    Str(&'a mut [u8]),
    None,
}

/// One named, typed, fixed-capacity configuration slot
#[derive(Debug)]
pub struct Entry<'a> {
    key: &'a str,
    slot: Slot<'a>,
}

impl<'a> Entry<'a> {
    /// Unsigned 32-bit entry backed by `value`
    pub fn uint32(key: &'a str, value: &'a mut u32) -> Self {
        Self {
            key,
            slot: Slot::UInt32(value),
        }
    }

    /// Signed 32-bit entry backed by `value`
    pub fn int32(key: &'a str, value: &'a mut i32) -> Self {
        Self {
            key,
            slot: Slot::Int32(value),
        }
    }

    /// Float entry backed by `value`
    pub fn float(key: &'a str, value: &'a mut f32) -> Self {
        Self {
            key,
            slot: Slot::Float(value),
        }
    }

    /// Boolean entry backed by `value`
    pub fn boolean(key: &'a str, value: &'a mut bool) -> Self {
        Self {
            key,
            slot: Slot::Bool(value),
        }
    }

    /// String entry backed by `buffer`
    ///
    /// The buffer length is the entry's capacity. One byte is always kept
    /// for the NUL terminator, so the longest storable string is
    /// `buffer.len() - 1` bytes.
    pub fn string(key: &'a str, buffer: &'a mut [u8]) -> Self {
        Self {
            key,
            slot: Slot::Str(buffer),
        }
    }

    /// Entry without storage
    ///
    /// Reserves a key (and an index) without backing it with a value. Every
    /// non-empty write and every parse against it fails.
    pub fn none(key: &'a str) -> Self {
        Self {
            key,
            slot: Slot::None,
        }
    }

    /// Entry key
    pub fn key(&self) -> &'a str {
        self.key
    }

    /// Declared type
    pub fn value_type(&self) -> ValueType {
        match self.slot {
            Slot::UInt32(_) => ValueType::UInt32,
            Slot::Int32(_) => ValueType::Int32,
            Slot::Float(_) => ValueType::Float,
            Slot::Bool(_) => ValueType::Bool,
            Slot::Str(_) => ValueType::String,
            Slot::None => ValueType::None,
        }
    }

    /// Storage size in bytes
    pub fn capacity(&self) -> usize {
        match &self.slot {
            Slot::UInt32(_) | Slot::Int32(_) | Slot::Float(_) => SCALAR_WIDTH,
            Slot::Bool(_) => 1,
            Slot::Str(buffer) => buffer.len(),
            Slot::None => 0,
        }
    }

    /// Current payload size in bytes
    ///
    /// For strings this is the number of bytes before the terminator; for
    /// scalars it equals [`capacity`](Self::capacity).
    pub fn payload_len(&self) -> usize {
        match &self.slot {
            Slot::Str(buffer) => terminated_len(buffer),
            _ => self.capacity(),
        }
    }

    /// Raw storage bytes in native byte order
    ///
    /// Always exactly [`capacity`](Self::capacity) bytes long. Writing these
    /// bytes back through `set_by_idx` reproduces the storage exactly.
    pub fn raw(&self) -> RawValue<'_> {
        let inline = |bytes: [u8; SCALAR_WIDTH], len| RawValue::Inline { bytes, len };
        match &self.slot {
            Slot::UInt32(v) => inline(v.to_ne_bytes(), SCALAR_WIDTH),
            Slot::Int32(v) => inline(v.to_ne_bytes(), SCALAR_WIDTH),
            Slot::Float(v) => inline(v.to_ne_bytes(), SCALAR_WIDTH),
            Slot::Bool(v) => inline([u8::from(**v), 0, 0, 0], 1),
            Slot::Str(buffer) => RawValue::Borrowed(buffer),
            Slot::None => inline([0; SCALAR_WIDTH], 0),
        }
    }

    /// Typed snapshot of the current value
    ///
    /// String storage that is not valid UTF-8 is cut at the first invalid
    /// byte.
    pub fn value(&self) -> Value<'_> {
        match &self.slot {
            Slot::UInt32(v) => Value::UInt32(**v),
            Slot::Int32(v) => Value::Int32(**v),
            Slot::Float(v) => Value::Float(**v),
            Slot::Bool(v) => Value::Bool(**v),
            Slot::Str(buffer) => {
                let bytes = &buffer[..terminated_len(buffer)];
                let text = match core::str::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
                };
                Value::Str(text)
            }
            Slot::None => Value::None,
        }
    }

    /// String payload, strictly validated as UTF-8
    pub(crate) fn text(&self) -> Result<&str, CfgError> {
        match &self.slot {
            Slot::Str(buffer) => {
                core::str::from_utf8(&buffer[..terminated_len(buffer)]).map_err(|_| CfgError::Error)
            }
            _ => Err(CfgError::TypeMismatch),
        }
    }

    /// Copy `bytes` into storage and zero the rest of it
    ///
    /// Nothing is written unless the whole value is accepted.
    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CfgError> {
        if bytes.len() > self.capacity() {
            return Err(CfgError::TooLarge);
        }

        match &mut self.slot {
            Slot::UInt32(v) => **v = u32::from_ne_bytes(zero_extend(bytes)),
            Slot::Int32(v) => **v = i32::from_ne_bytes(zero_extend(bytes)),
            Slot::Float(v) => **v = f32::from_ne_bytes(zero_extend(bytes)),
            Slot::Bool(v) => {
                **v = match bytes.first() {
                    None | Some(0) => false,
                    Some(1) => true,
                    Some(_) => return Err(CfgError::Error),
                }
            }
            Slot::Str(buffer) => {
                // Terminator must survive the write
                if terminated_len(bytes) >= buffer.len() {
                    return Err(CfgError::TooLarge);
                }
                buffer[..bytes.len()].copy_from_slice(bytes);
                buffer[bytes.len()..].fill(0);
            }
            Slot::None => {}
        }

        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Entry<'_> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}={}", self.key, self.value());
    }
}

/// Raw storage bytes of an entry, see [`Entry::raw`]
#[derive(Debug, Clone, Copy)]
pub enum RawValue<'a> {
    /// Scalar copied out of its storage
    Inline {
        /// Native-endian bytes, zero padded
        bytes: [u8; SCALAR_WIDTH],
        /// Number of meaningful bytes
        len: usize,
    },
    /// String buffer borrowed from storage
    Borrowed(&'a [u8]),
}

impl Deref for RawValue<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            RawValue::Inline { bytes, len } => &bytes[..*len],
            RawValue::Borrowed(bytes) => bytes,
        }
    }
}

impl AsRef<[u8]> for RawValue<'_> {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

/// Typed snapshot of an entry's value
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Value<'a> {
    /// Entry without storage
    None,
    /// Unsigned 32-bit integer
    UInt32(u32),
    /// Signed 32-bit integer
    Int32(i32),
    /// 32-bit float
    Float(f32),
    /// String payload (without terminator)
    Str(&'a str),
    /// Boolean
    Bool(bool),
}

impl Value<'_> {
    /// Type of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::None => ValueType::None,
            Value::UInt32(_) => ValueType::UInt32,
            Value::Int32(_) => ValueType::Int32,
            Value::Float(_) => ValueType::Float,
            Value::Str(_) => ValueType::String,
            Value::Bool(_) => ValueType::Bool,
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => f.write_str(s),
            Value::Bool(v) => write!(f, "{}", v),
        }
    }
}

fn terminated_len(bytes: &[u8]) -> usize {
    bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len())
}

fn zero_extend(bytes: &[u8]) -> [u8; SCALAR_WIDTH] {
    let mut out = [0u8; SCALAR_WIDTH];
    out[..bytes.len()].copy_from_slice(bytes);
    out
}
