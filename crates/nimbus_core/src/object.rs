//! Model objects and the fetch/save/delete protocol.
//!
//! An object moves through two states:
//!
//! ```text
//! New (no object id) --fetch/login/sign-up--> Persisted --delete--> New
//! ```
//!
//! Each operation is split into a request-building half that reads local
//! state and an apply half that commits the response. Nothing is mutated
//! until the response is known to be a success.

use crate::client::Client;
use crate::dirty::DirtyTracker;
use crate::error::{InvalidRequestError, NimbusResult};
use crate::fields::{FieldStore, ACL, CREATE_DATE, OBJECT_ID, UPDATE_DATE};
use nimbus_transport::{Method, Request};
use serde_json::{Map, Value};

/// Remote collection an object lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// The user collection.
    Users,
    /// A data class.
    Class(String),
}

impl Endpoint {
    /// Returns the collection path relative to the API version.
    pub fn collection_path(&self) -> String {
        match self {
            Endpoint::Users => "users".to_string(),
            Endpoint::Class(name) => format!("classes/{name}"),
        }
    }

    /// Returns the path of one object in the collection.
    pub fn object_path(&self, object_id: &str) -> String {
        format!("{}/{}", self.collection_path(), object_id)
    }
}

/// A locally modelled remote record.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelObject {
    endpoint: Endpoint,
    object_id: Option<String>,
    fields: FieldStore,
    dirty: DirtyTracker,
}

impl ModelObject {
    /// Creates a new object with no object id.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            object_id: None,
            fields: FieldStore::new(),
            dirty: DirtyTracker::new(),
        }
    }

    /// Creates a new object in the data class `class_name`.
    pub fn class(class_name: impl Into<String>) -> Self {
        Self::new(Endpoint::Class(class_name.into()))
    }

    /// Rebuilds an object from a stored snapshot, leaving nothing dirty.
    ///
    /// `objectId` becomes the object id; every other entry (reserved ones
    /// included) lands in the field store as is.
    pub fn from_snapshot(endpoint: Endpoint, mut snapshot: Map<String, Value>) -> Self {
        let object_id = take_object_id(&mut snapshot);
        Self {
            endpoint,
            object_id,
            fields: FieldStore::from_map(snapshot),
            dirty: DirtyTracker::new(),
        }
    }

    /// Returns the full state as one JSON object, object id included.
    pub fn to_snapshot(&self) -> Map<String, Value> {
        let mut map = self.fields.to_map();
        if let Some(id) = &self.object_id {
            map.insert(OBJECT_ID.to_string(), Value::String(id.clone()));
        }
        map
    }

    /// Returns the endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the object id.
    pub fn object_id(&self) -> Option<&str> {
        self.object_id.as_deref()
    }

    /// Sets the object id.
    pub fn set_object_id(&mut self, object_id: impl Into<String>) {
        self.object_id = Some(object_id.into());
    }

    /// Clears the object id.
    pub fn clear_object_id(&mut self) {
        self.object_id = None;
    }

    /// Returns the access-control list as raw JSON.
    pub fn acl(&self) -> Option<&Value> {
        self.fields.reserved(ACL)
    }

    /// Replaces the access-control list.
    ///
    /// The list is local only: saves never send it, and the next response
    /// carrying an `acl` replaces it.
    pub fn set_acl(&mut self, acl: Value) {
        self.fields.set_reserved(ACL, Some(acl));
    }

    /// Returns the server's creation timestamp.
    pub fn create_date(&self) -> Option<&str> {
        self.fields.reserved(CREATE_DATE).and_then(Value::as_str)
    }

    /// Returns the server's last-update timestamp.
    pub fn update_date(&self) -> Option<&str> {
        self.fields.reserved(UPDATE_DATE).and_then(Value::as_str)
    }

    /// Returns a field value. Always `None` for reserved keys.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Sets a field and marks it dirty. No-op for reserved keys.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        if self.fields.insert(key, value.into()) {
            self.dirty.mark_set(key);
        } else {
            tracing::debug!(key, "ignored write to reserved key");
        }
    }

    /// Removes a field and records a tombstone. No-op for reserved keys.
    pub fn remove(&mut self, key: &str) {
        if self.fields.remove(key) {
            self.dirty.mark_removed(key);
        }
    }

    /// Returns true if there are unsynced local mutations.
    pub fn needs_update(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Returns the field store.
    pub fn fields(&self) -> &FieldStore {
        &self.fields
    }

    /// Returns the dirty tracker.
    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    fn require_object_id(&self) -> NimbusResult<&str> {
        match self.object_id.as_deref() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(InvalidRequestError::EmptyObjectId.into()),
        }
    }

    pub(crate) fn fetch_request(&self) -> NimbusResult<Request> {
        let id = self.require_object_id()?;
        Ok(Request::new(Method::Get, self.endpoint.object_path(id)))
    }

    /// Discards local state in favour of `body`.
    pub(crate) fn apply_fetch(&mut self, mut body: Map<String, Value>) {
        if let Some(id) = take_object_id(&mut body) {
            self.object_id = Some(id);
        }
        self.fields.replace(body);
        self.dirty.reset();
    }

    /// Builds the update request and returns the payload it carries.
    pub(crate) fn save_request(&self) -> NimbusResult<(Request, Map<String, Value>)> {
        let id = self.require_object_id()?;
        let payload = self.dirty.build_patch_payload(&self.fields);
        let request = Request::new(Method::Put, self.endpoint.object_path(id))
            .with_json(&Value::Object(payload.clone()));
        Ok((request, payload))
    }

    /// Acknowledges what `sent` carried, then merges `body`.
    ///
    /// Acknowledgement compares against local state, so a server that
    /// normalizes a value does not leave the field dirty.
    pub(crate) fn apply_save(&mut self, body: Map<String, Value>, sent: &Map<String, Value>) {
        self.dirty.acknowledge(sent, &self.fields);
        self.merge_response(body);
    }

    pub(crate) fn delete_request(&self) -> NimbusResult<Request> {
        let id = self.require_object_id()?;
        Ok(Request::new(Method::Delete, self.endpoint.object_path(id)))
    }

    /// Returns the object to the New state.
    pub(crate) fn apply_delete(&mut self) {
        self.object_id = None;
        self.fields.clear();
        self.dirty.reset();
    }

    /// Overwrites or adds the response fields, object id included.
    pub(crate) fn merge_response(&mut self, mut body: Map<String, Value>) {
        if let Some(id) = take_object_id(&mut body) {
            self.object_id = Some(id);
        }
        self.fields.merge(body);
    }

    /// Returns the patch payload of every pending change.
    pub(crate) fn pending_changes(&self) -> Map<String, Value> {
        self.dirty.build_patch_payload(&self.fields)
    }

    /// Fetches the object by id, replacing every local field.
    ///
    /// # Errors
    ///
    /// Fails with `EmptyObjectId` before any request if there is no object
    /// id; otherwise forwards the transport error. Local state is untouched
    /// on failure.
    pub fn fetch(&mut self, client: &Client) -> NimbusResult<()> {
        let request = self.fetch_request()?;
        let body = client.send(request)?;
        self.apply_fetch(body);
        Ok(())
    }

    /// Sends the dirty fields as an update.
    ///
    /// An empty `{}` update is still sent when nothing is dirty.
    ///
    /// # Errors
    ///
    /// Fails with `EmptyObjectId` before any request if there is no object
    /// id; otherwise forwards the transport error. On failure the fields and
    /// dirty set are exactly as before, so a retry resends the same delta.
    pub fn save(&mut self, client: &Client) -> NimbusResult<()> {
        let (request, sent) = self.save_request()?;
        let body = client.send(request)?;
        self.apply_save(body, &sent);
        Ok(())
    }

    /// Deletes the object and returns it to the New state.
    ///
    /// # Errors
    ///
    /// Fails with `EmptyObjectId` before any request if there is no object
    /// id; otherwise forwards the transport error.
    pub fn delete(&mut self, client: &Client) -> NimbusResult<()> {
        let request = self.delete_request()?;
        client.send(request)?;
        self.apply_delete();
        Ok(())
    }

    /// Runs [`fetch`](Self::fetch) in the background.
    ///
    /// `callback` receives the object back together with the result,
    /// exactly once.
    pub fn fetch_in_background<F>(mut self, client: &Client, callback: F)
    where
        F: FnOnce(ModelObject, NimbusResult<()>) + Send + 'static,
    {
        let client_ref = client.clone();
        client.dispatch(
            move || {
                let result = self.fetch(&client_ref);
                (self, result)
            },
            move |(object, result)| callback(object, result),
        );
    }

    /// Runs [`save`](Self::save) in the background.
    pub fn save_in_background<F>(mut self, client: &Client, callback: F)
    where
        F: FnOnce(ModelObject, NimbusResult<()>) + Send + 'static,
    {
        let client_ref = client.clone();
        client.dispatch(
            move || {
                let result = self.save(&client_ref);
                (self, result)
            },
            move |(object, result)| callback(object, result),
        );
    }

    /// Runs [`delete`](Self::delete) in the background.
    pub fn delete_in_background<F>(mut self, client: &Client, callback: F)
    where
        F: FnOnce(ModelObject, NimbusResult<()>) + Send + 'static,
    {
        let client_ref = client.clone();
        client.dispatch(
            move || {
                let result = self.delete(&client_ref);
                (self, result)
            },
            move |(object, result)| callback(object, result),
        );
    }
}

fn take_object_id(map: &mut Map<String, Value>) -> Option<String> {
    match map.remove(OBJECT_ID) {
        Some(Value::String(id)) => Some(id),
        _ => None,
    }
}
