//! Directory-backed file manager for persistent storage.

use crate::error::{StorageError, StorageResult};
use crate::manager::{LocalFileManager, StorageSlot};
use parking_lot::Mutex;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A file manager that keeps one file per slot inside a directory.
///
/// Data survives process restarts.
///
/// # Durability
///
/// `save` writes to a temporary sibling, syncs it and renames it over the
/// slot file, so a crash mid-write leaves either the old or the new blob.
///
/// # Thread Safety
///
/// Writes are serialized through an internal lock; reads go straight to
/// the file system.
///
/// # Example
///
/// ```no_run
/// use nimbus_storage::{FileManager, LocalFileManager, StorageSlot};
/// use std::path::Path;
///
/// let manager = FileManager::open(Path::new("nimbus-data")).unwrap();
/// manager.save(StorageSlot::CurrentUser, b"{\"userName\":\"alice\"}").unwrap();
/// ```
#[derive(Debug)]
pub struct FileManager {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileManager {
    /// Opens a file manager rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or if `root`
    /// names an existing regular file.
    pub fn open(root: &Path) -> StorageResult<Self> {
        if root.exists() && !root.is_dir() {
            return Err(StorageError::Corrupted(format!(
                "{} exists and is not a directory",
                root.display()
            )));
        }
        fs::create_dir_all(root)?;

        Ok(Self {
            root: root.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the directory holding the slot files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of the file backing `slot`.
    #[must_use]
    pub fn slot_path(&self, slot: StorageSlot) -> PathBuf {
        self.root.join(slot.file_name())
    }

    fn temp_path(&self, slot: StorageSlot) -> PathBuf {
        self.root.join(format!(".{}.tmp", slot.file_name()))
    }
}

impl LocalFileManager for FileManager {
    fn load(&self, slot: StorageSlot) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(self.slot_path(slot)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, slot: StorageSlot, data: &[u8]) -> StorageResult<()> {
        let _guard = self.write_lock.lock();

        let temp = self.temp_path(slot);
        {
            let mut file = fs::File::create(&temp)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(&temp, self.slot_path(slot))?;

        tracing::debug!(%slot, bytes = data.len(), "saved local slot");
        Ok(())
    }

    fn delete(&self, slot: StorageSlot) -> StorageResult<()> {
        let _guard = self.write_lock.lock();

        match fs::remove_file(self.slot_path(slot)) {
            Ok(()) => {
                tracing::debug!(%slot, "deleted local slot");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_load_missing_slot() {
        let dir = tempdir().unwrap();
        let manager = FileManager::open(dir.path()).unwrap();
        assert!(manager.load(StorageSlot::CurrentUser).unwrap().is_none());
    }

    #[test]
    fn file_save_and_load() {
        let dir = tempdir().unwrap();
        let manager = FileManager::open(dir.path()).unwrap();

        manager.save(StorageSlot::CurrentUser, b"hello").unwrap();
        let data = manager.load(StorageSlot::CurrentUser).unwrap();
        assert_eq!(data.as_deref(), Some(&b"hello"[..]));
        assert!(manager.slot_path(StorageSlot::CurrentUser).exists());
    }

    #[test]
    fn file_save_overwrites() {
        let dir = tempdir().unwrap();
        let manager = FileManager::open(dir.path()).unwrap();

        manager.save(StorageSlot::CurrentUser, b"first").unwrap();
        manager.save(StorageSlot::CurrentUser, b"second").unwrap();
        let data = manager.load(StorageSlot::CurrentUser).unwrap();
        assert_eq!(data.as_deref(), Some(&b"second"[..]));
        assert!(!manager.temp_path(StorageSlot::CurrentUser).exists());
    }

    #[test]
    fn file_delete() {
        let dir = tempdir().unwrap();
        let manager = FileManager::open(dir.path()).unwrap();

        manager.save(StorageSlot::CurrentUser, b"data").unwrap();
        manager.delete(StorageSlot::CurrentUser).unwrap();
        assert!(manager.load(StorageSlot::CurrentUser).unwrap().is_none());

        // Deleting an empty slot is fine
        manager.delete(StorageSlot::CurrentUser).unwrap();
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();

        {
            let manager = FileManager::open(dir.path()).unwrap();
            manager.save(StorageSlot::CurrentUser, b"persistent data").unwrap();
        }

        {
            let manager = FileManager::open(dir.path()).unwrap();
            let data = manager.load(StorageSlot::CurrentUser).unwrap();
            assert_eq!(data.as_deref(), Some(&b"persistent data"[..]));
        }
    }

    #[test]
    fn file_create_nested_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested").join("path");

        let manager = FileManager::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(manager.root(), root);
    }

    #[test]
    fn file_root_is_regular_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("not-a-dir");
        fs::write(&path, b"x").unwrap();

        let result = FileManager::open(&path);
        assert!(matches!(result, Err(StorageError::Corrupted(_))));
    }
}
