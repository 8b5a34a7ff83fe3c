//! In-memory file manager for testing.

use crate::error::{StorageError, StorageResult};
use crate::manager::{LocalFileManager, StorageSlot};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

/// A single recorded `save` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRecord {
    /// Slot that was written.
    pub slot: StorageSlot,
    /// Bytes that were written.
    pub data: Vec<u8>,
}

impl SaveRecord {
    /// Returns the written bytes as UTF-8 text (lossy).
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// An in-memory file manager.
///
/// This manager keeps all slots in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Hosts that never want a session to outlive the process
///
/// Every `save` and `delete` is appended to a log so tests can assert on
/// exactly which writes happened.
///
/// # Example
///
/// ```rust
/// use nimbus_storage::{InMemoryFileManager, LocalFileManager, StorageSlot};
///
/// let manager = InMemoryFileManager::new();
/// manager.delete(StorageSlot::CurrentUser).unwrap();
/// assert_eq!(manager.delete_log(), vec![StorageSlot::CurrentUser]);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryFileManager {
    slots: RwLock<HashMap<StorageSlot, Vec<u8>>>,
    save_log: RwLock<Vec<SaveRecord>>,
    delete_log: RwLock<Vec<StorageSlot>>,
    fail_writes: AtomicBool,
}

impl InMemoryFileManager {
    /// Creates a new empty in-memory manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager whose `slot` already holds `data`.
    ///
    /// Useful for testing session restore.
    #[must_use]
    pub fn with_data(slot: StorageSlot, data: impl Into<Vec<u8>>) -> Self {
        let manager = Self::new();
        manager.slots.write().insert(slot, data.into());
        manager
    }

    /// Returns a copy of all recorded saves, oldest first.
    #[must_use]
    pub fn save_log(&self) -> Vec<SaveRecord> {
        self.save_log.read().clone()
    }

    /// Returns a copy of all recorded deletes, oldest first.
    #[must_use]
    pub fn delete_log(&self) -> Vec<StorageSlot> {
        self.delete_log.read().clone()
    }

    /// Returns the bytes currently held in `slot` without touching the logs.
    #[must_use]
    pub fn contents(&self, slot: StorageSlot) -> Option<Vec<u8>> {
        self.slots.read().get(&slot).cloned()
    }

    /// Makes every subsequent `save` and `delete` fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "writes disabled",
            )));
        }
        Ok(())
    }
}

impl LocalFileManager for InMemoryFileManager {
    fn load(&self, slot: StorageSlot) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.slots.read().get(&slot).cloned())
    }

    fn save(&self, slot: StorageSlot, data: &[u8]) -> StorageResult<()> {
        self.check_writable()?;
        self.slots.write().insert(slot, data.to_vec());
        self.save_log.write().push(SaveRecord {
            slot,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn delete(&self, slot: StorageSlot) -> StorageResult<()> {
        self.check_writable()?;
        self.slots.write().remove(&slot);
        self.delete_log.write().push(slot);
        Ok(())
    }
}
