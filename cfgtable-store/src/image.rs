//! Binary table image
//!
//! Layout:
//!
//! ```text
//! ┌───────┬─────────┬───────┬───────┬──────────────────────────┐
//! │ MAGIC │ VERSION │ COUNT │ CRC32 │ RECORDS                  │
//! │ 4B LE │ 1B      │ 2B LE │ 4B LE │ COUNT × postcard record  │
//! └───────┴─────────┴───────┴───────┴──────────────────────────┘
//! ```
//!
//! Each record carries the entry key, its type tag and the entry's full raw
//! storage. The CRC covers the record bytes. Records are matched back to
//! entries by key, so an image stays loadable after entries are added,
//! removed or reordered.

use serde::{Deserialize, Serialize};

use cfgtable_core::{CfgError, ConfigTable, ValueType};

use crate::fmt::{debug, warn};

/// Magic number to identify a table image
pub const IMAGE_MAGIC: u32 = 0x4346_4754; // "CFGT"

/// Current image format version
pub const IMAGE_VERSION: u8 = 1;

/// Size of the fixed image header
pub const HEADER_LEN: usize = 11;

/// Image encoding and decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImageError {
    /// Image shorter than its header
    Truncated,
    /// Bad magic number or trailing bytes after the records
    InvalidFormat,
    /// Image written by an incompatible format version
    VersionMismatch,
    /// CRC check failed
    CrcMismatch,
    /// A record could not be decoded
    Deserialize,
    /// A record could not be encoded
    Serialize,
    /// Output buffer too small for the image
    BufferTooSmall,
    /// Table has more entries than the header can count
    TooManyEntries,
}

/// Outcome of [`decode_into`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoadReport {
    /// Entries restored from the image
    pub restored: usize,
    /// Records with no matching entry, a different type, or rejected bytes
    pub skipped: usize,
}

/// One persisted entry
#[derive(Debug, Serialize, Deserialize)]
struct EntryRecord<'a> {
    key: &'a str,
    value_type: ValueType,
    bytes: &'a [u8],
}

struct ImageHeader {
    count: u16,
    crc: u32,
}

impl ImageHeader {
    fn read(image: &[u8]) -> Result<Self, ImageError> {
        if image.len() < HEADER_LEN {
            return Err(ImageError::Truncated);
        }

        let magic = u32::from_le_bytes([image[0], image[1], image[2], image[3]]);
        if magic != IMAGE_MAGIC {
            return Err(ImageError::InvalidFormat);
        }
        if image[4] != IMAGE_VERSION {
            return Err(ImageError::VersionMismatch);
        }

        Ok(Self {
            count: u16::from_le_bytes([image[5], image[6]]),
            crc: u32::from_le_bytes([image[7], image[8], image[9], image[10]]),
        })
    }

    fn write(&self, buffer: &mut [u8]) {
        buffer[0..4].copy_from_slice(&IMAGE_MAGIC.to_le_bytes());
        buffer[4] = IMAGE_VERSION;
        buffer[5..7].copy_from_slice(&self.count.to_le_bytes());
        buffer[7..11].copy_from_slice(&self.crc.to_le_bytes());
    }
}

/// Encode every entry of `table` into `buffer`
///
/// Returns the number of bytes written.
pub fn encode_table<const N: usize>(
    table: &ConfigTable<'_, N>,
    buffer: &mut [u8],
) -> Result<usize, ImageError> {
    let count = u16::try_from(N).map_err(|_| ImageError::TooManyEntries)?;
    if buffer.len() < HEADER_LEN {
        return Err(ImageError::BufferTooSmall);
    }

    let mut offset = HEADER_LEN;
    for entry in table {
        let raw = entry.raw();
        let record = EntryRecord {
            key: entry.key(),
            value_type: entry.value_type(),
            bytes: &raw,
        };
        let used = postcard::to_slice(&record, &mut buffer[offset..])
            .map_err(|e| match e {
                postcard::Error::SerializeBufferFull => ImageError::BufferTooSmall,
                _ => ImageError::Serialize,
            })?
            .len();
        offset += used;
    }

    let header = ImageHeader {
        count,
        crc: crc32(&buffer[HEADER_LEN..offset]),
    };
    header.write(buffer);

    debug!("Encoded {} entries into {} bytes", N, offset);
    Ok(offset)
}

/// Restore `table` from an image produced by [`encode_table`]
///
/// The header, CRC and every record are validated before the first entry is
/// written, so a damaged image leaves the table untouched. Records that do
/// not fit the current table are skipped and counted.
pub fn decode_into<const N: usize>(
    table: &mut ConfigTable<'_, N>,
    image: &[u8],
) -> Result<LoadReport, ImageError> {
    let header = ImageHeader::read(image)?;
    let body = &image[HEADER_LEN..];

    if crc32(body) != header.crc {
        return Err(ImageError::CrcMismatch);
    }

    // Validation pass
    let mut rest = body;
    for _ in 0..header.count {
        let (_, tail) = take_record(rest)?;
        rest = tail;
    }
    if !rest.is_empty() {
        return Err(ImageError::InvalidFormat);
    }

    let mut report = LoadReport::default();
    let mut rest = body;
    for _ in 0..header.count {
        let (record, tail) = take_record(rest)?;
        rest = tail;

        match apply_record(table, &record) {
            Ok(()) => report.restored += 1,
            Err(e) => {
                warn!("Skipping stored entry {}: {:?}", record.key, e);
                report.skipped += 1;
            }
        }
    }

    Ok(report)
}

fn take_record(bytes: &[u8]) -> Result<(EntryRecord<'_>, &[u8]), ImageError> {
    postcard::take_from_bytes(bytes).map_err(|_| ImageError::Deserialize)
}

fn apply_record<const N: usize>(
    table: &mut ConfigTable<'_, N>,
    record: &EntryRecord<'_>,
) -> Result<(), CfgError> {
    let idx = table.resolve(record.key).ok_or(CfgError::UnknownKey)?;
    if table.get_by_idx(idx)?.value_type() != record.value_type {
        return Err(CfgError::TypeMismatch);
    }

    // Zero fill restores the tail, which lets a string follow its entry
    // across capacity changes
    let bytes = match record.value_type {
        ValueType::String => match record.bytes.iter().position(|&b| b == 0) {
            Some(nul) => &record.bytes[..=nul],
            None => record.bytes,
        },
        _ => record.bytes,
    };
    table.set_by_idx(idx, bytes)
}

/// CRC-32/ISO-HDLC of `data`, bit by bit over the reflected polynomial
fn crc32(data: &[u8]) -> u32 {
    const REFLECTED_POLY: u32 = 0xEDB8_8320;

    let crc = data.iter().fold(u32::MAX, |crc, &byte| {
        (0..8).fold(crc ^ u32::from(byte), |crc, _| {
            // All ones when the low bit is set
            let mask = (crc & 1).wrapping_neg();
            (crc >> 1) ^ (REFLECTED_POLY & mask)
        })
    });
    !crc
}
