//! cfgtable storage abstraction layer
//!
//! This crate defines the storage traits a board support package implements
//! so that configuration tables can be persisted without the core crate
//! knowing anything about the medium.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  cfgtable-store (image codec, loader)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  cfgtable-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  NOR flash +  │       │   RAM / file  │
//! │ seq. storage  │       │  (host tests) │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`flash::FlashStorage`] - Persistent key-value storage

#![no_std]
#![deny(unsafe_code)]

pub mod flash;

pub use flash::{FlashError, FlashStorage, StorageKey};
