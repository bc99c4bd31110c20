//! Configuration table persistence
//!
//! Saves a [`ConfigTable`](cfgtable_core::ConfigTable) to flash storage and
//! restores it on boot:
//!
//! - [`image`] encodes every entry's raw storage into a checksummed binary
//!   image and decodes it back through `set_by_idx`
//! - [`persistence`] drives a [`FlashStorage`](cfgtable_hal::FlashStorage)
//!   implementation, preferring the binary image and falling back to
//!   `key: value` text
//!
//! Enable the `defmt` feature to log load and save outcomes.

#![no_std]
#![deny(unsafe_code)]

mod fmt;

pub mod image;
pub mod persistence;

pub use image::{decode_into, encode_table, ImageError, LoadReport, IMAGE_MAGIC, IMAGE_VERSION};
pub use persistence::{ConfigPersistence, LoadSource, PersistError, MAX_IMAGE_SIZE, MAX_TEXT_SIZE};
