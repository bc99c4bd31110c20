//! Configuration persistence
//!
//! Loads a configuration table from flash storage and saves it back.
//! Keeps the table's defaults if flash holds nothing.

use core::str;

use cfgtable_core::{CfgError, ConfigTable, KvParser, TextReport};
use cfgtable_hal::{FlashError, FlashStorage, StorageKey};

use crate::fmt::{debug, info, warn};
use crate::image::{decode_into, encode_table, ImageError, LoadReport};

/// Maximum binary image size
pub const MAX_IMAGE_SIZE: usize = 2048;

/// Maximum `key: value` text size
pub const MAX_TEXT_SIZE: usize = 8192;

/// Configuration persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PersistError {
    /// Flash operation failed
    Flash(FlashError),
    /// Binary image invalid or could not be built
    Image(ImageError),
    /// Invalid UTF-8 in stored text
    InvalidUtf8,
    /// Rendered text exceeds [`MAX_TEXT_SIZE`]
    TextTooLarge,
    /// An entry has no single-line text form
    Text(CfgError),
}

impl From<FlashError> for PersistError {
    fn from(e: FlashError) -> Self {
        PersistError::Flash(e)
    }
}

impl From<ImageError> for PersistError {
    fn from(e: ImageError) -> Self {
        PersistError::Image(e)
    }
}

/// Where [`ConfigPersistence::load`] found the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadSource {
    /// Restored from the binary image
    Image(LoadReport),
    /// Applied from stored `key: value` text
    Text(TextReport),
    /// Nothing stored, table keeps its defaults
    Defaults,
}

/// Configuration persistence manager
///
/// Handles loading and saving configuration tables through a
/// [`FlashStorage`] implementation.
pub struct ConfigPersistence<S> {
    storage: S,
    parser: KvParser,
}

impl<S: FlashStorage> ConfigPersistence<S> {
    /// Create a new persistence manager using the default text format
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            parser: KvParser::new(),
        }
    }

    /// Use `parser` settings for the text form
    pub fn with_parser(mut self, parser: KvParser) -> Self {
        self.parser = parser;
        self
    }

    /// Consume this persistence manager and return the underlying storage
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Load configuration from flash into `table`
    ///
    /// Tries the binary image first, then the text form. If neither is
    /// stored the table keeps its defaults. A damaged image is reported as
    /// an error only when no text form is available to fall back on; the
    /// table is never partially written from a damaged image.
    pub async fn load<const N: usize>(
        &mut self,
        table: &mut ConfigTable<'_, N>,
    ) -> Result<LoadSource, PersistError> {
        info!("Loading configuration from flash...");

        let image_error = match self.load_image(table).await {
            Ok(report) => {
                info!(
                    "Restored {} entries from image ({} skipped)",
                    report.restored,
                    report.skipped
                );
                return Ok(LoadSource::Image(report));
            }
            Err(PersistError::Flash(FlashError::NotFound)) => {
                debug!("No table image found, trying text");
                None
            }
            Err(e) => {
                warn!("Failed to load table image: {:?}, trying text", e);
                Some(e)
            }
        };

        match self.load_text(table).await {
            Ok(report) => {
                info!(
                    "Applied {} lines from text ({} rejected)",
                    report.applied,
                    report.rejected
                );
                if let Some(line_error) = report.first_error {
                    warn!(
                        "First rejected line {}: {:?}",
                        line_error.line,
                        line_error.error
                    );
                }
                Ok(LoadSource::Text(report))
            }
            Err(PersistError::Flash(FlashError::NotFound)) => match image_error {
                Some(e) => Err(e),
                None => {
                    info!("No stored configuration, using defaults");
                    Ok(LoadSource::Defaults)
                }
            },
            Err(e) => Err(e),
        }
    }

    /// Save `table` as a binary image
    ///
    /// Returns the image size in bytes.
    pub async fn save<const N: usize>(
        &mut self,
        table: &ConfigTable<'_, N>,
    ) -> Result<usize, PersistError> {
        let mut buffer = [0u8; MAX_IMAGE_SIZE];
        let len = encode_table(table, &mut buffer)?;

        debug!("Saving {} bytes of table image to flash", len);

        self.storage
            .write(StorageKey::ConfigImage, &buffer[..len])
            .await?;

        info!("Saved configuration image to flash");
        Ok(len)
    }

    /// Save `table` as `key: value` text
    ///
    /// Returns the text size in bytes. Flash is left untouched if any entry
    /// cannot be written as one line.
    pub async fn save_text<const N: usize>(
        &mut self,
        table: &ConfigTable<'_, N>,
    ) -> Result<usize, PersistError> {
        let text = self
            .parser
            .to_text::<MAX_TEXT_SIZE, N>(table)
            .map_err(|e| match e {
                CfgError::TooLarge => PersistError::TextTooLarge,
                e => PersistError::Text(e),
            })?;

        debug!("Saving {} bytes of configuration text to flash", text.len());

        self.storage
            .write(StorageKey::ConfigText, text.as_bytes())
            .await?;

        info!("Saved configuration text to flash");
        Ok(text.len())
    }

    /// Erase all stored configuration
    pub async fn erase(&mut self) -> Result<(), PersistError> {
        warn!("Erasing stored configuration");
        self.storage.erase_all().await?;
        Ok(())
    }

    /// Restore from the binary image
    async fn load_image<const N: usize>(
        &mut self,
        table: &mut ConfigTable<'_, N>,
    ) -> Result<LoadReport, PersistError> {
        let mut buffer = [0u8; MAX_IMAGE_SIZE];
        let len = self
            .storage
            .read(StorageKey::ConfigImage, &mut buffer)
            .await?;

        debug!("Read {} bytes of table image from flash", len);

        Ok(decode_into(table, &buffer[..len])?)
    }

    /// Apply the stored text form
    async fn load_text<const N: usize>(
        &mut self,
        table: &mut ConfigTable<'_, N>,
    ) -> Result<TextReport, PersistError> {
        let mut buffer = [0u8; MAX_TEXT_SIZE];
        let len = self
            .storage
            .read(StorageKey::ConfigText, &mut buffer)
            .await?;

        debug!("Read {} bytes of configuration text from flash", len);

        let text = str::from_utf8(&buffer[..len]).map_err(|_| PersistError::InvalidUtf8)?;
        Ok(self.parser.apply_text(table, text))
    }
}
