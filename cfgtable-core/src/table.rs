//! Configuration table and typed accessors
//!
//! The table is an ordered array of [`Entry`] descriptors. The index of an
//! entry is its position in that array and never changes, so persistence
//! code can walk `0..len()` and rely on stable positions.

use crate::entry::{Entry, Value, ValueType};
use crate::error::CfgError;
use crate::parse::DEFAULT_SEPARATOR;

/// Fixed set of configuration entries over application-owned storage
///
/// The table holds mutable borrows of the storage for its whole lifetime;
/// drop it to access the storage directly again.
#[derive(Debug)]
pub struct ConfigTable<'a, const N: usize> {
    entries: [Entry<'a>; N],
}

impl<'a, const N: usize> ConfigTable<'a, N> {
    /// Build a table from its entries
    ///
    /// Fails with [`CfgError::NullInput`] if a key is empty, with
    /// [`CfgError::InvalidKey`] if a key could not be addressed from a
    /// `key: value` line, and with [`CfgError::DuplicateKey`] if two entries
    /// share a key.
    pub fn new(entries: [Entry<'a>; N]) -> Result<Self, CfgError> {
        for (i, entry) in entries.iter().enumerate() {
            if entry.key().is_empty() {
                return Err(CfgError::NullInput);
            }
            if !is_line_key(entry.key()) {
                return Err(CfgError::InvalidKey);
            }
            if entries[..i].iter().any(|e| e.key() == entry.key()) {
                return Err(CfgError::DuplicateKey);
            }
        }
        Ok(Self { entries })
    }

    /// Number of entries
    pub const fn len(&self) -> usize {
        N
    }

    /// Check if the table has no entries
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Iterate entries in index order
    pub fn iter(&self) -> core::slice::Iter<'_, Entry<'a>> {
        self.entries.iter()
    }

    /// Index of the entry with the given key
    ///
    /// Linear scan in table order; the first exact match wins.
    pub fn resolve(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key() == key)
    }

    /// Entry with the given key
    pub fn get_by_key(&self, key: &str) -> Result<&Entry<'a>, CfgError> {
        let idx = self.resolve_key(key)?;
        self.get_by_idx(idx)
    }

    /// Entry at the given index
    pub fn get_by_idx(&self, idx: usize) -> Result<&Entry<'a>, CfgError> {
        self.entries.get(idx).ok_or(CfgError::OutOfRange)
    }

    /// Write raw bytes into the entry with the given key
    ///
    /// See [`set_by_idx`](Self::set_by_idx).
    pub fn set_by_key(&mut self, key: &str, bytes: &[u8]) -> Result<(), CfgError> {
        let idx = self.resolve_key(key)?;
        self.set_by_idx(idx, bytes)
    }

    /// Write raw bytes into the entry at the given index
    ///
    /// Copies `bytes` into the start of the storage and zeroes the remaining
    /// `capacity - bytes.len()` bytes. Fails with [`CfgError::TooLarge`] if
    /// the bytes do not fit, which for strings includes the terminator, and
    /// leaves the storage untouched on any failure.
    pub fn set_by_idx(&mut self, idx: usize, bytes: &[u8]) -> Result<(), CfgError> {
        self.entries
            .get_mut(idx)
            .ok_or(CfgError::OutOfRange)?
            .write_bytes(bytes)
    }

    // Typed getters

    /// Get an unsigned 32-bit value by key
    pub fn get_u32_by_key(&self, key: &str) -> Result<u32, CfgError> {
        self.get_u32_by_idx(self.resolve_key(key)?)
    }

    /// Get an unsigned 32-bit value by index
    pub fn get_u32_by_idx(&self, idx: usize) -> Result<u32, CfgError> {
        match self.get_by_idx(idx)?.value() {
            Value::UInt32(v) => Ok(v),
            _ => Err(CfgError::TypeMismatch),
        }
    }

    /// Get a signed 32-bit value by key
    pub fn get_i32_by_key(&self, key: &str) -> Result<i32, CfgError> {
        self.get_i32_by_idx(self.resolve_key(key)?)
    }

    /// Get a signed 32-bit value by index
    pub fn get_i32_by_idx(&self, idx: usize) -> Result<i32, CfgError> {
        match self.get_by_idx(idx)?.value() {
            Value::Int32(v) => Ok(v),
            _ => Err(CfgError::TypeMismatch),
        }
    }

    /// Get a float value by key
    pub fn get_f32_by_key(&self, key: &str) -> Result<f32, CfgError> {
        self.get_f32_by_idx(self.resolve_key(key)?)
    }

    /// Get a float value by index
    pub fn get_f32_by_idx(&self, idx: usize) -> Result<f32, CfgError> {
        match self.get_by_idx(idx)?.value() {
            Value::Float(v) => Ok(v),
            _ => Err(CfgError::TypeMismatch),
        }
    }

    /// Get a boolean value by key
    pub fn get_bool_by_key(&self, key: &str) -> Result<bool, CfgError> {
        self.get_bool_by_idx(self.resolve_key(key)?)
    }

    /// Get a boolean value by index
    pub fn get_bool_by_idx(&self, idx: usize) -> Result<bool, CfgError> {
        match self.get_by_idx(idx)?.value() {
            Value::Bool(v) => Ok(v),
            _ => Err(CfgError::TypeMismatch),
        }
    }

    /// Get a string by key, borrowed from its storage
    pub fn get_str_by_key(&self, key: &str) -> Result<&str, CfgError> {
        self.get_str_by_idx(self.resolve_key(key)?)
    }

    /// Get a string by index, borrowed from its storage
    ///
    /// Fails with [`CfgError::Error`] if the stored bytes are not UTF-8.
    pub fn get_str_by_idx(&self, idx: usize) -> Result<&str, CfgError> {
        self.get_by_idx(idx)?.text()
    }

    // Typed setters

    /// Set an unsigned 32-bit value by key
    pub fn set_u32_by_key(&mut self, key: &str, value: u32) -> Result<(), CfgError> {
        let idx = self.resolve_key(key)?;
        self.set_u32_by_idx(idx, value)
    }

    /// Set an unsigned 32-bit value by index
    pub fn set_u32_by_idx(&mut self, idx: usize, value: u32) -> Result<(), CfgError> {
        self.set_typed(idx, ValueType::UInt32, &value.to_ne_bytes())
    }

    /// Set a signed 32-bit value by key
    pub fn set_i32_by_key(&mut self, key: &str, value: i32) -> Result<(), CfgError> {
        let idx = self.resolve_key(key)?;
        self.set_i32_by_idx(idx, value)
    }

    /// Set a signed 32-bit value by index
    pub fn set_i32_by_idx(&mut self, idx: usize, value: i32) -> Result<(), CfgError> {
        self.set_typed(idx, ValueType::Int32, &value.to_ne_bytes())
    }

    /// Set a float value by key
    pub fn set_f32_by_key(&mut self, key: &str, value: f32) -> Result<(), CfgError> {
        let idx = self.resolve_key(key)?;
        self.set_f32_by_idx(idx, value)
    }

    /// Set a float value by index
    pub fn set_f32_by_idx(&mut self, idx: usize, value: f32) -> Result<(), CfgError> {
        self.set_typed(idx, ValueType::Float, &value.to_ne_bytes())
    }

    /// Set a boolean value by key
    pub fn set_bool_by_key(&mut self, key: &str, value: bool) -> Result<(), CfgError> {
        let idx = self.resolve_key(key)?;
        self.set_bool_by_idx(idx, value)
    }

    /// Set a boolean value by index
    pub fn set_bool_by_idx(&mut self, idx: usize, value: bool) -> Result<(), CfgError> {
        self.set_typed(idx, ValueType::Bool, &[u8::from(value)])
    }

    /// Set a string by key
    pub fn set_str_by_key(&mut self, key: &str, value: &str) -> Result<(), CfgError> {
        let idx = self.resolve_key(key)?;
        self.set_str_by_idx(idx, value)
    }

    /// Set a string by index
    ///
    /// Fails with [`CfgError::TooLarge`] unless `value` is shorter than the
    /// entry's capacity.
    pub fn set_str_by_idx(&mut self, idx: usize, value: &str) -> Result<(), CfgError> {
        self.set_typed(idx, ValueType::String, value.as_bytes())
    }

    fn resolve_key(&self, key: &str) -> Result<usize, CfgError> {
        if key.is_empty() {
            return Err(CfgError::NullInput);
        }
        self.resolve(key).ok_or(CfgError::UnknownKey)
    }

    fn set_typed(&mut self, idx: usize, expected: ValueType, bytes: &[u8]) -> Result<(), CfgError> {
        if self.get_by_idx(idx)?.value_type() != expected {
            return Err(CfgError::TypeMismatch);
        }
        self.set_by_idx(idx, bytes)
    }
}

impl<'t, 'a, const N: usize> IntoIterator for &'t ConfigTable<'a, N> {
    type Item = &'t Entry<'a>;
    type IntoIter = core::slice::Iter<'t, Entry<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Check that `key` survives a trip through a text line
///
/// Lines are trimmed and split at the first separator, and `#` starts a
/// comment, so none of those may appear in a key.
fn is_line_key(key: &str) -> bool {
    !key.starts_with('#')
        && !key
            .chars()
            .any(|c| c == DEFAULT_SEPARATOR || c.is_whitespace() || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    const UINT32_DEFAULT: u32 = 115_200;
    const INT32_DEFAULT: i32 = -42;
    const FLOAT_DEFAULT: f32 = 1.5;
    const BOOL_DEFAULT: bool = true;
    const MAX_STRING_LEN: usize = 16;

    struct Storage {
        uint32: u32,
        int32: i32,
        float: f32,
        string: [u8; MAX_STRING_LEN],
        boolean: bool,
    }

    impl Storage {
        fn new() -> Self {
            let mut string = [0u8; MAX_STRING_LEN];
            string[..6].copy_from_slice(b"foobar");
            Self {
                uint32: UINT32_DEFAULT,
                int32: INT32_DEFAULT,
                float: FLOAT_DEFAULT,
                string,
                boolean: BOOL_DEFAULT,
            }
        }

        fn table(&mut self) -> ConfigTable<'_, 5> {
            ConfigTable::new([
                Entry::uint32("uint32_t", &mut self.uint32),
                Entry::int32("int32_t", &mut self.int32),
                Entry::float("float", &mut self.float),
                Entry::string("string", &mut self.string),
                Entry::boolean("bool", &mut self.boolean),
            ])
            .unwrap()
        }
    }

    #[test]
    fn test_resolve_matches_position() {
        let mut storage = Storage::new();
        let table = storage.table();

        assert_eq!(table.resolve("uint32_t"), Some(0));
        assert_eq!(table.resolve("string"), Some(3));
        assert_eq!(table.resolve("bool"), Some(4));
        assert_eq!(table.resolve("missing"), None);
        // Exact match only, no prefixes
        assert_eq!(table.resolve("str"), None);
        assert_eq!(table.resolve("string2"), None);
    }

    #[test]
    fn test_generic_getter() {
        let mut storage = Storage::new();
        let table = storage.table();

        let entry = table.get_by_key("uint32_t").unwrap();
        assert_eq!(entry.value_type(), ValueType::UInt32);
        assert_eq!(entry.capacity(), 4);
        assert_eq!(entry.value(), Value::UInt32(UINT32_DEFAULT));

        let entry = table.get_by_key("string").unwrap();
        assert_eq!(entry.value_type(), ValueType::String);
        assert_eq!(entry.value(), Value::Str("foobar"));

        assert_eq!(table.get_by_key("invalid").err(), Some(CfgError::UnknownKey));
        assert_eq!(table.get_by_key("").err(), Some(CfgError::NullInput));
        assert_eq!(table.get_by_idx(5).err(), Some(CfgError::OutOfRange));
    }

    #[test]
    fn test_generic_setter_int() {
        let mut storage = Storage::new();
        let mut table = storage.table();

        let doubled = table.get_i32_by_key("int32_t").unwrap() * 2;
        table.set_by_key("int32_t", &doubled.to_ne_bytes()).unwrap();
        assert_eq!(table.get_i32_by_key("int32_t"), Ok(-84));
    }

    #[test]
    fn test_generic_setter_string_bounds() {
        let mut storage = Storage::new();
        let mut table = storage.table();

        // 16 chars plus terminator
        assert_eq!(
            table.set_by_key("string", b"abcdefghijklmnop\0"),
            Err(CfgError::TooLarge)
        );
        assert_eq!(table.get_str_by_key("string"), Ok("foobar"));

        // 15 chars plus terminator barely fits
        table.set_by_key("string", b"abcdefghijklmno\0").unwrap();
        assert_eq!(table.get_str_by_key("string"), Ok("abcdefghijklmno"));
        assert_eq!(table.get_by_key("string").unwrap().raw()[MAX_STRING_LEN - 1], 0);

        // Shorter write clears the stale tail
        table.set_by_key("string", b"abcdefg\0").unwrap();
        assert_eq!(table.get_str_by_key("string"), Ok("abcdefg"));
        let raw = table.get_by_key("string").unwrap().raw();
        assert!(raw[7..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_setter_errors() {
        let mut storage = Storage::new();
        let mut table = storage.table();

        assert_eq!(table.set_by_key("nope", &[1]), Err(CfgError::UnknownKey));
        assert_eq!(table.set_by_key("", &[1]), Err(CfgError::NullInput));
        assert_eq!(table.set_by_idx(9, &[1]), Err(CfgError::OutOfRange));
        assert_eq!(table.set_by_idx(0, &[1, 2, 3, 4, 5]), Err(CfgError::TooLarge));
        assert_eq!(table.get_u32_by_idx(0), Ok(UINT32_DEFAULT));
    }

    #[test]
    fn test_specialized_getters() {
        let mut storage = Storage::new();
        let table = storage.table();

        let idx = table.resolve("uint32_t").unwrap();
        assert_eq!(table.get_u32_by_key("uint32_t"), Ok(UINT32_DEFAULT));
        assert_eq!(table.get_u32_by_idx(idx), Ok(UINT32_DEFAULT));

        let idx = table.resolve("int32_t").unwrap();
        assert_eq!(table.get_i32_by_key("int32_t"), Ok(INT32_DEFAULT));
        assert_eq!(table.get_i32_by_idx(idx), Ok(INT32_DEFAULT));

        let idx = table.resolve("float").unwrap();
        assert_eq!(table.get_f32_by_key("float"), Ok(FLOAT_DEFAULT));
        assert_eq!(table.get_f32_by_idx(idx), Ok(FLOAT_DEFAULT));

        let idx = table.resolve("string").unwrap();
        assert_eq!(table.get_str_by_key("string"), Ok("foobar"));
        assert_eq!(table.get_str_by_idx(idx), Ok("foobar"));

        let idx = table.resolve("bool").unwrap();
        assert_eq!(table.get_bool_by_key("bool"), Ok(BOOL_DEFAULT));
        assert_eq!(table.get_bool_by_idx(idx), Ok(BOOL_DEFAULT));
    }

    #[test]
    fn test_specialized_getters_type_mismatch() {
        let mut storage = Storage::new();
        let table = storage.table();

        for idx in 0..table.len() {
            let ty = table.get_by_idx(idx).unwrap().value_type();
            if ty != ValueType::UInt32 {
                assert_eq!(table.get_u32_by_idx(idx), Err(CfgError::TypeMismatch));
            }
            if ty != ValueType::Int32 {
                assert_eq!(table.get_i32_by_idx(idx), Err(CfgError::TypeMismatch));
            }
            if ty != ValueType::Float {
                assert_eq!(table.get_f32_by_idx(idx), Err(CfgError::TypeMismatch));
            }
            if ty != ValueType::Bool {
                assert_eq!(table.get_bool_by_idx(idx), Err(CfgError::TypeMismatch));
            }
            if ty != ValueType::String {
                assert_eq!(table.get_str_by_idx(idx), Err(CfgError::TypeMismatch));
            }
        }
    }

    #[test]
    fn test_typed_setters() {
        let mut storage = Storage::new();
        let mut table = storage.table();

        table.set_u32_by_key("uint32_t", 9600).unwrap();
        table.set_i32_by_key("int32_t", i32::MIN).unwrap();
        table.set_f32_by_key("float", -0.25).unwrap();
        table.set_bool_by_key("bool", false).unwrap();
        table.set_str_by_key("string", "hello").unwrap();

        assert_eq!(table.set_u32_by_key("int32_t", 1), Err(CfgError::TypeMismatch));
        assert_eq!(table.set_str_by_key("bool", "x"), Err(CfgError::TypeMismatch));
        assert_eq!(
            table.set_str_by_key("string", "0123456789abcdef"),
            Err(CfgError::TooLarge)
        );

        drop(table);
        assert_eq!(storage.uint32, 9600);
        assert_eq!(storage.int32, i32::MIN);
        assert_eq!(storage.float, -0.25);
        assert!(!storage.boolean);
        assert_eq!(&storage.string[..6], b"hello\0");
    }

    #[test]
    fn test_construction_rejects_bad_keys() {
        let mut a = 0u32;
        let mut b = 0u32;
        let result = ConfigTable::new([Entry::uint32("dup", &mut a), Entry::uint32("dup", &mut b)]);
        assert_eq!(result.err(), Some(CfgError::DuplicateKey));

        let mut a = 0u32;
        let result = ConfigTable::new([Entry::uint32("", &mut a)]);
        assert_eq!(result.err(), Some(CfgError::NullInput));
    }

    #[test]
    fn test_construction_rejects_unaddressable_keys() {
        for key in ["net:port", " port", "port ", "net port", "#port", "port\r", "a\tb"] {
            let mut v = 0u32;
            let result = ConfigTable::new([Entry::uint32(key, &mut v)]);
            assert_eq!(result.err(), Some(CfgError::InvalidKey), "key {:?}", key);
        }

        // Dots, dashes and a later '#' are fine
        let mut a = 0u32;
        let mut b = 0u32;
        let table = ConfigTable::new([
            Entry::uint32("net.port-2", &mut a),
            Entry::uint32("color#1", &mut b),
        ]);
        assert!(table.is_ok());
    }

    #[test]
    fn test_iteration_order() {
        let mut storage = Storage::new();
        let table = storage.table();

        let mut keys = table.iter().map(|e| e.key());
        assert_eq!(keys.next(), Some("uint32_t"));
        assert_eq!(keys.next(), Some("int32_t"));
        assert_eq!(keys.next(), Some("float"));
        assert_eq!(keys.next(), Some("string"));
        assert_eq!(keys.next(), Some("bool"));
        assert_eq!(keys.next(), None);
        assert_eq!((&table).into_iter().count(), table.len());
    }
}
