//! Session users and the authentication protocol.

use crate::client::Client;
use crate::error::{NimbusError, NimbusResult};
use crate::object::{Endpoint, ModelObject};
use nimbus_transport::{Method, Request};
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Key of the user name.
pub const USER_NAME: &str = "userName";
/// Key of the password.
pub const PASSWORD: &str = "password";
/// Key of the mail address.
pub const MAIL_ADDRESS: &str = "mailAddress";
/// Key of the external-auth payload.
pub const AUTH_DATA: &str = "authData";
/// Key of the session token.
pub const SESSION_TOKEN: &str = "sessionToken";
/// Key of the mail-confirmation flag.
pub const MAIL_ADDRESS_CONFIRM: &str = "mailAddressConfirm";
/// Key of the temporary-password flag.
pub const TEMPORARY_PASSWORD: &str = "temporaryPassword";

const LOGIN_PATH: &str = "login";
const LOGOUT_PATH: &str = "logout";
const AUTHENTICATION_MAIL_PATH: &str = "requestMailAddressUserEntry";
const PASSWORD_RESET_PATH: &str = "requestPasswordReset";

/// Credentials for [`SessionUser::log_in`].
#[derive(Clone, PartialEq, Eq)]
pub enum LogInCredentials {
    /// Log in by user name.
    UserName {
        /// User name.
        user_name: String,
        /// Password.
        password: String,
    },
    /// Log in by mail address.
    MailAddress {
        /// Mail address.
        mail_address: String,
        /// Password.
        password: String,
    },
}

impl LogInCredentials {
    /// Credentials identified by user name.
    pub fn user_name(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self::UserName {
            user_name: user_name.into(),
            password: password.into(),
        }
    }

    /// Credentials identified by mail address.
    pub fn mail_address(mail_address: impl Into<String>, password: impl Into<String>) -> Self {
        Self::MailAddress {
            mail_address: mail_address.into(),
            password: password.into(),
        }
    }

    fn request(&self) -> Request {
        let (key, identity, password) = match self {
            Self::UserName {
                user_name,
                password,
            } => (USER_NAME, user_name, password),
            Self::MailAddress {
                mail_address,
                password,
            } => (MAIL_ADDRESS, mail_address, password),
        };
        Request::new(Method::Get, LOGIN_PATH)
            .with_query(key, identity.as_str())
            .with_query(PASSWORD, password.as_str())
    }
}

impl std::fmt::Debug for LogInCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserName { user_name, .. } => f
                .debug_struct("UserName")
                .field("user_name", user_name)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::MailAddress { mail_address, .. } => f
                .debug_struct("MailAddress")
                .field("mail_address", mail_address)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}

/// A user account in the `users` collection.
///
/// `SessionUser` is a shared handle: clones refer to the same underlying
/// record, so the instance held by the current-user cache and the one an
/// application mutates stay in step. Use [`duplicate`](Self::duplicate) for
/// an independent copy.
///
/// Network round trips never hold the record lock.
#[derive(Debug, Clone)]
pub struct SessionUser {
    inner: Arc<RwLock<ModelObject>>,
}

impl SessionUser {
    /// Creates a user with no object id.
    pub fn new() -> Self {
        Self::from_object(ModelObject::new(Endpoint::Users))
    }

    /// Rebuilds a user from a stored snapshot, leaving nothing dirty.
    pub fn from_snapshot(snapshot: Map<String, Value>) -> Self {
        Self::from_object(ModelObject::from_snapshot(Endpoint::Users, snapshot))
    }

    fn from_object(object: ModelObject) -> Self {
        Self {
            inner: Arc::new(RwLock::new(object)),
        }
    }

    /// Returns the full state as one JSON object, object id included.
    pub fn to_snapshot(&self) -> Map<String, Value> {
        self.inner.read().to_snapshot()
    }

    /// Returns a copy of the underlying record.
    pub fn to_object(&self) -> ModelObject {
        self.inner.read().clone()
    }

    /// Returns an independent deep copy.
    pub fn duplicate(&self) -> Self {
        Self::from_object(self.to_object())
    }

    /// Returns true if both handles refer to the same record.
    pub fn ptr_eq(&self, other: &SessionUser) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the object id.
    pub fn object_id(&self) -> Option<String> {
        self.inner.read().object_id().map(str::to_string)
    }

    /// Sets the object id.
    pub fn set_object_id(&self, object_id: impl Into<String>) {
        self.inner.write().set_object_id(object_id);
    }

    /// Returns the access-control list.
    pub fn acl(&self) -> Option<Value> {
        self.inner.read().acl().cloned()
    }

    /// Replaces the access-control list.
    pub fn set_acl(&self, acl: Value) {
        self.inner.write().set_acl(acl);
    }

    /// Returns the server's creation timestamp.
    pub fn create_date(&self) -> Option<String> {
        self.inner.read().create_date().map(str::to_string)
    }

    /// Returns the server's last-update timestamp.
    pub fn update_date(&self) -> Option<String> {
        self.inner.read().update_date().map(str::to_string)
    }

    /// Returns a field value. Always `None` for reserved keys.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().get(key).cloned()
    }

    /// Sets a field and marks it dirty. No-op for reserved keys.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.inner.write().set(key, value);
    }

    /// Removes a field and records a tombstone.
    pub fn remove(&self, key: &str) {
        self.inner.write().remove(key);
    }

    /// Returns true if there are unsynced local mutations.
    pub fn needs_update(&self) -> bool {
        self.inner.read().needs_update()
    }

    fn get_str(&self, key: &str) -> Option<String> {
        self.inner
            .read()
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn set_optional_str(&self, key: &str, value: Option<String>) {
        match value {
            Some(value) => self.set(key, value),
            None => self.remove(key),
        }
    }

    /// Returns the user name.
    pub fn user_name(&self) -> Option<String> {
        self.get_str(USER_NAME)
    }

    /// Sets or removes the user name.
    pub fn set_user_name(&self, user_name: Option<String>) {
        self.set_optional_str(USER_NAME, user_name);
    }

    /// Returns the password, if set locally.
    pub fn password(&self) -> Option<String> {
        self.get_str(PASSWORD)
    }

    /// Sets or removes the password.
    pub fn set_password(&self, password: Option<String>) {
        self.set_optional_str(PASSWORD, password);
    }

    /// Returns the mail address.
    pub fn mail_address(&self) -> Option<String> {
        self.get_str(MAIL_ADDRESS)
    }

    /// Sets or removes the mail address.
    pub fn set_mail_address(&self, mail_address: Option<String>) {
        self.set_optional_str(MAIL_ADDRESS, mail_address);
    }

    /// Returns the external-auth payload, if it is a JSON object.
    pub fn auth_data(&self) -> Option<Map<String, Value>> {
        self.inner
            .read()
            .get(AUTH_DATA)
            .and_then(Value::as_object)
            .cloned()
    }

    /// Sets or removes the external-auth payload.
    pub fn set_auth_data(&self, auth_data: Option<Map<String, Value>>) {
        match auth_data {
            Some(map) => self.set(AUTH_DATA, Value::Object(map)),
            None => self.remove(AUTH_DATA),
        }
    }

    /// Returns the session token issued by the server.
    pub fn session_token(&self) -> Option<String> {
        self.get_str(SESSION_TOKEN)
    }

    /// Returns true if the user holds a non-empty session token.
    pub fn is_authenticated(&self) -> bool {
        self.session_token().is_some_and(|token| !token.is_empty())
    }

    /// Returns whether the mail address has been confirmed.
    pub fn mail_address_confirm(&self) -> Option<bool> {
        self.inner
            .read()
            .get(MAIL_ADDRESS_CONFIRM)
            .and_then(Value::as_bool)
    }

    /// Returns whether the current password is a temporary one.
    pub fn temporary_password(&self) -> Option<bool> {
        self.inner
            .read()
            .get(TEMPORARY_PASSWORD)
            .and_then(Value::as_bool)
    }

    /// Registers this user and makes it the current user.
    ///
    /// Sends every non-reserved field. On success the response is merged,
    /// the changes the request covered are cleared, and the user is
    /// installed and persisted. Fields mutated while the request was in
    /// flight stay dirty.
    ///
    /// # Errors
    ///
    /// Forwards the transport error; local state and the cache are
    /// untouched on failure.
    pub fn sign_up(&self, client: &Client) -> NimbusResult<()> {
        let (body, pending) = {
            let object = self.inner.read();
            (object.fields().non_reserved(), object.pending_changes())
        };
        let request = Request::new(Method::Post, Endpoint::Users.collection_path())
            .with_json(&Value::Object(body));
        let response = client.send_unscoped(request)?;

        self.inner.write().apply_save(response, &pending);
        client.cache().install(self);
        tracing::info!(object_id = ?self.object_id(), "signed up");
        Ok(())
    }

    /// Logs in and makes the returned user current.
    ///
    /// The returned user holds exactly the fields of the response, so the
    /// password never reaches the cache.
    ///
    /// # Errors
    ///
    /// Forwards the transport error; the cache is untouched on failure.
    pub fn log_in(client: &Client, credentials: &LogInCredentials) -> NimbusResult<SessionUser> {
        let response = client.send_unscoped(credentials.request())?;
        let user = SessionUser::from_snapshot(response);
        client.cache().install(&user);
        tracing::info!(object_id = ?user.object_id(), "logged in");
        Ok(user)
    }

    /// Logs out the current user.
    ///
    /// On success the cache is cleared and the slot deleted.
    ///
    /// # Errors
    ///
    /// Forwards the transport error; the cache and the slot are untouched
    /// on failure.
    pub fn log_out(client: &Client) -> NimbusResult<()> {
        client.send(Request::new(Method::Get, LOGOUT_PATH))?;
        client.cache().clear();
        tracing::info!("logged out");
        Ok(())
    }

    /// Asks the server to mail a registration link to `mail_address`.
    ///
    /// # Errors
    ///
    /// Forwards the transport error.
    pub fn request_authentication_mail(client: &Client, mail_address: &str) -> NimbusResult<()> {
        Self::post_mail_address(client, AUTHENTICATION_MAIL_PATH, mail_address)
    }

    /// Asks the server to mail a password-reset link to `mail_address`.
    ///
    /// # Errors
    ///
    /// Forwards the transport error.
    pub fn request_password_reset(client: &Client, mail_address: &str) -> NimbusResult<()> {
        Self::post_mail_address(client, PASSWORD_RESET_PATH, mail_address)
    }

    fn post_mail_address(client: &Client, path: &str, mail_address: &str) -> NimbusResult<()> {
        let request =
            Request::new(Method::Post, path).with_json(&json!({ MAIL_ADDRESS: mail_address }));
        client.send_unscoped(request)?;
        Ok(())
    }

    /// Returns the current user, creating an anonymous one if allowed.
    ///
    /// # Errors
    ///
    /// Returns [`NimbusError::AutomaticUserNotAvailable`] without issuing a
    /// request when there is no current user and automatic users are
    /// disabled; otherwise forwards the transport error of the sign-up.
    pub fn automatic_current_user(client: &Client) -> NimbusResult<SessionUser> {
        if let Some(user) = client.current_user() {
            return Ok(user);
        }
        if !client.automatic_user_enabled() {
            return Err(NimbusError::AutomaticUserNotAvailable);
        }

        let _bootstrap = client.cache().bootstrap_guard();
        if let Some(user) = client.current_user() {
            return Ok(user);
        }

        let mut auth_data = Map::new();
        auth_data.insert(
            "anonymous".to_string(),
            json!({ "id": uuid::Uuid::new_v4().to_string() }),
        );

        let user = SessionUser::new();
        user.set_auth_data(Some(auth_data));
        user.sign_up(client)?;
        tracing::info!(object_id = ?user.object_id(), "created anonymous user");
        Ok(user)
    }

    /// Fetches the user, replacing every local field.
    ///
    /// If this is the current user the cache is updated and persisted.
    ///
    /// # Errors
    ///
    /// Fails with `EmptyObjectId` before any request if there is no object
    /// id; otherwise forwards the transport error.
    pub fn fetch(&self, client: &Client) -> NimbusResult<()> {
        let request = self.inner.read().fetch_request()?;
        let response = client.send(request)?;
        self.inner.write().apply_fetch(response);
        client.cache().sync_if_current(self);
        Ok(())
    }

    /// Sends the dirty fields as an update.
    ///
    /// If this is the current user the cache is updated and persisted.
    ///
    /// # Errors
    ///
    /// Fails with `EmptyObjectId` before any request if there is no object
    /// id; otherwise forwards the transport error.
    pub fn save(&self, client: &Client) -> NimbusResult<()> {
        let (request, sent) = self.inner.read().save_request()?;
        let response = client.send(request)?;
        self.inner.write().apply_save(response, &sent);
        client.cache().sync_if_current(self);
        Ok(())
    }

    /// Deletes the user.
    ///
    /// If this was the current user the cache is cleared and the slot
    /// deleted.
    ///
    /// # Errors
    ///
    /// Fails with `EmptyObjectId` before any request if there is no object
    /// id; otherwise forwards the transport error.
    pub fn delete(&self, client: &Client) -> NimbusResult<()> {
        let (request, object_id) = {
            let object = self.inner.read();
            (object.delete_request()?, object.object_id().map(str::to_string))
        };
        client.send(request)?;
        // Compare ids before the shared record is cleared
        if let Some(object_id) = object_id {
            client.cache().purge_if_current(&object_id);
        }
        self.inner.write().apply_delete();
        Ok(())
    }

    /// Runs [`sign_up`](Self::sign_up) in the background.
    pub fn sign_up_in_background<F>(&self, client: &Client, callback: F)
    where
        F: FnOnce(NimbusResult<()>) + Send + 'static,
    {
        let user = self.clone();
        let worker = client.clone();
        client.dispatch(move || user.sign_up(&worker), callback);
    }

    /// Runs [`log_in`](Self::log_in) in the background.
    pub fn log_in_in_background<F>(client: &Client, credentials: LogInCredentials, callback: F)
    where
        F: FnOnce(NimbusResult<SessionUser>) + Send + 'static,
    {
        let worker = client.clone();
        client.dispatch(move || Self::log_in(&worker, &credentials), callback);
    }

    /// Runs [`log_out`](Self::log_out) in the background.
    pub fn log_out_in_background<F>(client: &Client, callback: F)
    where
        F: FnOnce(NimbusResult<()>) + Send + 'static,
    {
        let worker = client.clone();
        client.dispatch(move || Self::log_out(&worker), callback);
    }

    /// Runs [`request_authentication_mail`](Self::request_authentication_mail)
    /// in the background.
    pub fn request_authentication_mail_in_background<F>(
        client: &Client,
        mail_address: impl Into<String>,
        callback: F,
    ) where
        F: FnOnce(NimbusResult<()>) + Send + 'static,
    {
        let worker = client.clone();
        let mail_address = mail_address.into();
        client.dispatch(
            move || Self::request_authentication_mail(&worker, &mail_address),
            callback,
        );
    }

    /// Runs [`request_password_reset`](Self::request_password_reset) in the
    /// background.
    pub fn request_password_reset_in_background<F>(
        client: &Client,
        mail_address: impl Into<String>,
        callback: F,
    ) where
        F: FnOnce(NimbusResult<()>) + Send + 'static,
    {
        let worker = client.clone();
        let mail_address = mail_address.into();
        client.dispatch(
            move || Self::request_password_reset(&worker, &mail_address),
            callback,
        );
    }

    /// Runs [`automatic_current_user`](Self::automatic_current_user) in the
    /// background.
    pub fn automatic_current_user_in_background<F>(client: &Client, callback: F)
    where
        F: FnOnce(NimbusResult<SessionUser>) + Send + 'static,
    {
        let worker = client.clone();
        client.dispatch(move || Self::automatic_current_user(&worker), callback);
    }

    /// Runs [`fetch`](Self::fetch) in the background.
    pub fn fetch_in_background<F>(&self, client: &Client, callback: F)
    where
        F: FnOnce(NimbusResult<()>) + Send + 'static,
    {
        let user = self.clone();
        let worker = client.clone();
        client.dispatch(move || user.fetch(&worker), callback);
    }

    /// Runs [`save`](Self::save) in the background.
    pub fn save_in_background<F>(&self, client: &Client, callback: F)
    where
        F: FnOnce(NimbusResult<()>) + Send + 'static,
    {
        let user = self.clone();
        let worker = client.clone();
        client.dispatch(move || user.save(&worker), callback);
    }

    /// Runs [`delete`](Self::delete) in the background.
    pub fn delete_in_background<F>(&self, client: &Client, callback: F)
    where
        F: FnOnce(NimbusResult<()>) + Send + 'static,
    {
        let user = self.clone();
        let worker = client.clone();
        client.dispatch(move || user.delete(&worker), callback);
    }
}

impl Default for SessionUser {
    fn default() -> Self {
        Self::new()
    }
}
