//! Dirty-field tracking.

use crate::fields::{is_reserved, FieldStore};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// How a field changed since the last sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldChange {
    /// The field was assigned a value.
    Set,
    /// The field was explicitly removed (a tombstone).
    Removed,
}

/// Records which fields changed locally since the last successful sync.
///
/// # Invariants
///
/// - A key is `Removed` iff it was removed and not re-set afterwards
/// - Reserved keys are never tracked
/// - The tracker is empty iff there are no unsynced mutations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtyTracker {
    changes: BTreeMap<String, FieldChange>,
}

impl DirtyTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `key` was set.
    pub fn mark_set(&mut self, key: &str) {
        if !is_reserved(key) {
            self.changes.insert(key.to_string(), FieldChange::Set);
        }
    }

    /// Records that `key` was removed.
    pub fn mark_removed(&mut self, key: &str) {
        if !is_reserved(key) {
            self.changes.insert(key.to_string(), FieldChange::Removed);
        }
    }

    /// Returns the recorded change for `key`.
    pub fn change(&self, key: &str) -> Option<FieldChange> {
        self.changes.get(key).copied()
    }

    /// Returns true if nothing changed since the last reset.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns the number of dirty keys.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Forgets every recorded change.
    pub fn reset(&mut self) {
        self.changes.clear();
    }

    /// Builds the update body: every dirty key mapped to its current value,
    /// tombstones as `null`. Untouched keys are omitted.
    pub fn build_patch_payload(&self, store: &FieldStore) -> Map<String, Value> {
        self.changes
            .iter()
            .map(|(key, change)| {
                let value = match change {
                    FieldChange::Set => store.get(key).cloned().unwrap_or(Value::Null),
                    FieldChange::Removed => Value::Null,
                };
                (key.clone(), value)
            })
            .collect()
    }

    /// Clears the entries that `sent` reconciled.
    ///
    /// An entry stays dirty if its current payload value differs from what
    /// was sent, i.e. it was mutated again while the request was in flight.
    pub fn acknowledge(&mut self, sent: &Map<String, Value>, store: &FieldStore) {
        let current = self.build_patch_payload(store);
        self.changes
            .retain(|key, _| match (sent.get(key), current.get(key)) {
                (Some(sent_value), Some(now)) => sent_value != now,
                _ => true,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn untouched_fields_are_omitted() {
        let mut store = FieldStore::new();
        store.insert("field1", json!("value1"));
        store.insert("field2", json!("value2"));

        let mut dirty = DirtyTracker::new();
        dirty.mark_set("field1");

        let payload = dirty.build_patch_payload(&store);
        assert_eq!(Value::Object(payload), json!({"field1": "value1"}));
    }

    #[test]
    fn tombstone_is_null() {
        let store = FieldStore::new();
        let mut dirty = DirtyTracker::new();
        dirty.mark_set("field1");
        dirty.mark_removed("field1");

        assert_eq!(dirty.change("field1"), Some(FieldChange::Removed));
        let payload = dirty.build_patch_payload(&store);
        assert_eq!(serde_json::to_string(&payload).unwrap(), r#"{"field1":null}"#);
    }

    #[test]
    fn set_after_remove_clears_tombstone() {
        let mut dirty = DirtyTracker::new();
        dirty.mark_removed("field1");
        dirty.mark_set("field1");
        assert_eq!(dirty.change("field1"), Some(FieldChange::Set));
    }

    #[test]
    fn reserved_keys_never_tracked() {
        let mut dirty = DirtyTracker::new();
        dirty.mark_set("objectId");
        dirty.mark_removed("acl");
        assert!(dirty.is_empty());
    }

    #[test]
    fn reset_empties() {
        let mut dirty = DirtyTracker::new();
        dirty.mark_set("a");
        dirty.mark_removed("b");
        assert_eq!(dirty.len(), 2);
        dirty.reset();
        assert!(dirty.is_empty());
        assert!(dirty.build_patch_payload(&FieldStore::new()).is_empty());
    }

    #[test]
    fn acknowledge_keeps_in_flight_mutations() {
        let mut store = FieldStore::new();
        let mut dirty = DirtyTracker::new();
        store.insert("a", json!(1));
        dirty.mark_set("a");
        store.insert("b", json!(2));
        dirty.mark_set("b");

        let sent = dirty.build_patch_payload(&store);

        // Mutated while the request was in flight
        store.insert("b", json!(3));
        dirty.mark_set("b");
        store.insert("c", json!(4));
        dirty.mark_set("c");

        dirty.acknowledge(&sent, &store);
        assert_eq!(dirty.change("a"), None);
        assert_eq!(dirty.change("b"), Some(FieldChange::Set));
        assert_eq!(dirty.change("c"), Some(FieldChange::Set));
    }

    proptest! {
        #[test]
        fn payload_has_exactly_dirty_keys(
            ops in proptest::collection::vec(("[a-e]", any::<bool>()), 0..20)
        ) {
            let mut store = FieldStore::new();
            let mut dirty = DirtyTracker::new();
            let mut expected = BTreeMap::new();

            for (key, set) in &ops {
                if *set {
                    store.insert(key, json!(key));
                    dirty.mark_set(key);
                    expected.insert(key.clone(), json!(key));
                } else {
                    store.remove(key);
                    dirty.mark_removed(key);
                    expected.insert(key.clone(), Value::Null);
                }
            }

            let payload = dirty.build_patch_payload(&store);
            prop_assert_eq!(payload.len(), expected.len());
            for (key, value) in expected {
                prop_assert_eq!(payload.get(&key), Some(&value));
            }
        }
    }
}
