//! Local file manager trait definition.

use crate::error::StorageResult;
use std::fmt;

/// A named persistence slot.
///
/// Each slot holds at most one blob. The session cache only uses
/// [`StorageSlot::CurrentUser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageSlot {
    /// The serialized fields of the signed-in user.
    CurrentUser,
}

impl StorageSlot {
    /// Returns the file name used for this slot.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            StorageSlot::CurrentUser => "currentUser",
        }
    }
}

impl fmt::Display for StorageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A typed byte-blob store for client-side state.
///
/// Managers are **opaque byte stores**. The runtime owns the format of
/// whatever it writes; managers never inspect it.
///
/// # Invariants
///
/// - `load` returns exactly the bytes of the last successful `save`
/// - `load` after `delete` (or before any `save`) returns `Ok(None)`
/// - `delete` of an empty slot succeeds
/// - Managers must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryFileManager`] - For testing
/// - [`super::FileManager`] - For persistent storage
pub trait LocalFileManager: Send + Sync {
    /// Loads the blob stored in `slot`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be read.
    fn load(&self, slot: StorageSlot) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the blob stored in `slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be written.
    fn save(&self, slot: StorageSlot, data: &[u8]) -> StorageResult<()>;

    /// Removes the blob stored in `slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing blob cannot be removed.
    fn delete(&self, slot: StorageSlot) -> StorageResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_file_name() {
        assert_eq!(StorageSlot::CurrentUser.file_name(), "currentUser");
        assert_eq!(format!("{}", StorageSlot::CurrentUser), "currentUser");
    }
}
