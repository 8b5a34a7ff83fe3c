//! # Nimbus Storage
//!
//! Local file slots for the nimbus client runtime.
//!
//! This crate provides the lowest-level persistence abstraction used by the
//! session cache. File managers are **opaque byte stores** keyed by a
//! [`StorageSlot`] - they do not interpret the data they store.
//!
//! ## Design Principles
//!
//! - One blob per slot (load, save, delete)
//! - No knowledge of the JSON layout of a cached user
//! - Must be `Send + Sync` so background callbacks can persist
//! - A missing slot is `Ok(None)`, never an error
//!
//! ## Available Managers
//!
//! - [`InMemoryFileManager`] - For testing, records every save and delete
//! - [`FileManager`] - For persistent storage in a directory
//!
//! ## Example
//!
//! ```rust
//! use nimbus_storage::{InMemoryFileManager, LocalFileManager, StorageSlot};
//!
//! let manager = InMemoryFileManager::new();
//! manager.save(StorageSlot::CurrentUser, b"{}").unwrap();
//! let data = manager.load(StorageSlot::CurrentUser).unwrap();
//! assert_eq!(data.as_deref(), Some(&b"{}"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod manager;
mod memory;

pub use error::{StorageError, StorageResult};
pub use file::FileManager;
pub use manager::{LocalFileManager, StorageSlot};
pub use memory::{InMemoryFileManager, SaveRecord};
