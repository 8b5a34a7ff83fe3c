//! Process-wide current-user cache backed by a local file slot.

use crate::user::SessionUser;
use nimbus_storage::{LocalFileManager, StorageResult, StorageSlot};
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Default)]
struct CacheState {
    /// Whether the slot has been read into memory.
    hydrated: bool,
    user: Option<SessionUser>,
}

/// Holds at most one authenticated user.
///
/// The memory copy is authoritative once hydrated; the slot is read at most
/// once, lazily, on the first lookup.
///
/// # Lock order
///
/// `state` is taken before any user lock, never the other way round.
pub(crate) struct CurrentUserCache {
    files: Arc<dyn LocalFileManager>,
    state: Mutex<CacheState>,
    bootstrap: Mutex<()>,
}

impl CurrentUserCache {
    pub(crate) fn new(files: Arc<dyn LocalFileManager>) -> Self {
        Self {
            files,
            state: Mutex::new(CacheState::default()),
            bootstrap: Mutex::new(()),
        }
    }

    /// Returns the cached user, reading the slot on first use.
    pub(crate) fn current(&self) -> Option<SessionUser> {
        let mut state = self.state.lock();
        self.hydrate(&mut state);
        state.user.clone()
    }

    /// Returns the session token of the cached user.
    pub(crate) fn session_token(&self) -> Option<String> {
        self.current().and_then(|user| user.session_token())
    }

    /// Makes `user` current and writes it to the slot.
    pub(crate) fn install(&self, user: &SessionUser) {
        let mut state = self.state.lock();
        state.user = Some(user.clone());
        state.hydrated = true;
        self.persist_logged(user);
    }

    /// Replaces the memory copy only.
    pub(crate) fn set(&self, user: Option<SessionUser>) {
        let mut state = self.state.lock();
        state.user = user;
        state.hydrated = true;
    }

    /// Drops the memory copy and deletes the slot.
    pub(crate) fn clear(&self) {
        let mut state = self.state.lock();
        state.user = None;
        state.hydrated = true;
        self.delete_logged();
    }

    /// Installs and persists `user` if it is the current user.
    ///
    /// Identity is the object id; a user without one never matches.
    pub(crate) fn sync_if_current(&self, user: &SessionUser) {
        let Some(object_id) = user.object_id() else {
            return;
        };

        let mut state = self.state.lock();
        self.hydrate(&mut state);
        let matches = state
            .user
            .as_ref()
            .and_then(SessionUser::object_id)
            .is_some_and(|current| current == object_id);

        if matches {
            state.user = Some(user.clone());
            self.persist_logged(user);
        }
    }

    /// Clears the cache and the slot if `object_id` is the current user.
    pub(crate) fn purge_if_current(&self, object_id: &str) {
        let mut state = self.state.lock();
        self.hydrate(&mut state);
        let matches = state
            .user
            .as_ref()
            .and_then(SessionUser::object_id)
            .is_some_and(|current| current == object_id);

        if matches {
            state.user = None;
            self.delete_logged();
        }
    }

    /// Serializes anonymous bootstrap.
    pub(crate) fn bootstrap_guard(&self) -> MutexGuard<'_, ()> {
        self.bootstrap.lock()
    }

    /// Reads and decodes the slot without touching the memory copy.
    ///
    /// A missing, unreadable or malformed slot yields `None`.
    pub(crate) fn load(&self) -> Option<SessionUser> {
        let bytes = match self.files.load(StorageSlot::CurrentUser) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read current user slot");
                return None;
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(snapshot)) => Some(SessionUser::from_snapshot(snapshot)),
            Ok(_) => {
                tracing::warn!("current user slot does not hold a JSON object");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "current user slot is not valid JSON");
                None
            }
        }
    }

    /// Writes `user` to the slot.
    pub(crate) fn persist(&self, user: &SessionUser) -> StorageResult<()> {
        let snapshot = Value::Object(user.to_snapshot());
        // Serializing a `Value` cannot fail
        let bytes = serde_json::to_vec(&snapshot).unwrap_or_default();
        self.files.save(StorageSlot::CurrentUser, &bytes)
    }

    /// Deletes the slot.
    pub(crate) fn delete(&self) -> StorageResult<()> {
        self.files.delete(StorageSlot::CurrentUser)
    }

    fn hydrate(&self, state: &mut CacheState) {
        if !state.hydrated {
            state.user = self.load();
            state.hydrated = true;
            tracing::debug!(restored = state.user.is_some(), "hydrated current user");
        }
    }

    fn persist_logged(&self, user: &SessionUser) {
        if let Err(e) = self.persist(user) {
            tracing::warn!(error = %e, "failed to persist current user");
        }
    }

    fn delete_logged(&self) {
        if let Err(e) = self.delete() {
            tracing::warn!(error = %e, "failed to delete current user slot");
        }
    }
}

impl std::fmt::Debug for CurrentUserCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUserCache").finish_non_exhaustive()
    }
}
