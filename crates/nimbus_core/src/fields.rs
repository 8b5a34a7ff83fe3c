//! Field container with server-reserved keys.

use serde_json::{Map, Value};

/// Key of the object id.
pub const OBJECT_ID: &str = "objectId";
/// Key of the access-control list.
pub const ACL: &str = "acl";
/// Key of the creation timestamp.
pub const CREATE_DATE: &str = "createDate";
/// Key of the last-update timestamp.
pub const UPDATE_DATE: &str = "updateDate";

/// Keys owned by the server.
///
/// These are write-protected and read-suppressed on the generic field
/// interface; they surface only through typed accessors.
pub const RESERVED_KEYS: [&str; 4] = [OBJECT_ID, ACL, CREATE_DATE, UPDATE_DATE];

/// Returns true if `key` is server-reserved.
pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// String-keyed JSON field container.
///
/// The store keeps reserved keys alongside ordinary ones so a server
/// response can be merged wholesale, but the generic accessors
/// ([`get`](Self::get), [`insert`](Self::insert), [`remove`](Self::remove))
/// refuse to expose or modify them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldStore {
    values: Map<String, Value>,
}

impl FieldStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding exactly `values`, reserved keys included.
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Returns the value for `key`, never a reserved one.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if is_reserved(key) {
            return None;
        }
        self.values.get(key)
    }

    /// Stores `value` under `key`.
    ///
    /// Returns false (and stores nothing) if `key` is reserved.
    pub fn insert(&mut self, key: &str, value: Value) -> bool {
        if is_reserved(key) {
            return false;
        }
        self.values.insert(key.to_string(), value);
        true
    }

    /// Removes `key`.
    ///
    /// Returns false (and removes nothing) if `key` is reserved.
    pub fn remove(&mut self, key: &str) -> bool {
        if is_reserved(key) {
            return false;
        }
        self.values.remove(key);
        true
    }

    /// Returns the raw value for a reserved key.
    pub(crate) fn reserved(&self, key: &str) -> Option<&Value> {
        debug_assert!(is_reserved(key));
        self.values.get(key)
    }

    /// Sets or clears a reserved key.
    pub(crate) fn set_reserved(&mut self, key: &str, value: Option<Value>) {
        debug_assert!(is_reserved(key));
        match value {
            Some(v) => {
                self.values.insert(key.to_string(), v);
            }
            None => {
                self.values.remove(key);
            }
        }
    }

    /// Overwrites or adds every entry of `values`; other keys are kept.
    pub fn merge(&mut self, values: Map<String, Value>) {
        for (key, value) in values {
            self.values.insert(key, value);
        }
    }

    /// Replaces the whole content with `values`.
    pub fn replace(&mut self, values: Map<String, Value>) {
        self.values = values;
    }

    /// Removes every entry, reserved ones included.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Returns true if a non-reserved `key` holds a value.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterates over the non-reserved keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values
            .keys()
            .map(String::as_str)
            .filter(|k| !is_reserved(k))
    }

    /// Returns every non-reserved entry.
    pub fn non_reserved(&self) -> Map<String, Value> {
        self.values
            .iter()
            .filter(|(k, _)| !is_reserved(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Returns every entry, reserved ones included.
    pub fn to_map(&self) -> Map<String, Value> {
        self.values.clone()
    }

    /// Returns the number of entries, reserved ones included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the store holds nothing at all.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
