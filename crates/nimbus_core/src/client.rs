//! Client runtime: executor, session cache and background dispatch.

use crate::cache::CurrentUserCache;
use crate::config::ClientConfig;
use crate::dispatch::Dispatcher;
use crate::error::NimbusResult;
use crate::user::SessionUser;
use nimbus_storage::{LocalFileManager, StorageResult};
use nimbus_transport::{Request, RequestExecutor};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Builder for a [`Client`].
pub struct ClientBuilder {
    executor: Arc<dyn RequestExecutor>,
    files: Arc<dyn LocalFileManager>,
    config: ClientConfig,
    dispatcher: Option<Dispatcher>,
}

impl ClientBuilder {
    /// Sets the configuration.
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs background operations on the blocking pool of `handle`.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.dispatcher = Some(Dispatcher::Runtime(handle));
        self
    }

    /// Sets the background dispatcher.
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Builds the client.
    ///
    /// Without an explicit dispatcher the runtime the caller is inside is
    /// used, or one thread per operation outside a runtime.
    pub fn build(self) -> Client {
        let dispatcher = self.dispatcher.unwrap_or_else(Dispatcher::current);
        let automatic_user = AtomicBool::new(self.config.automatic_user);
        Client {
            inner: Arc::new(ClientInner {
                cache: CurrentUserCache::new(self.files),
                executor: self.executor,
                automatic_user,
                config: self.config,
                dispatcher,
            }),
        }
    }
}

struct ClientInner {
    config: ClientConfig,
    automatic_user: AtomicBool,
    executor: Arc<dyn RequestExecutor>,
    cache: CurrentUserCache,
    dispatcher: Dispatcher,
}

/// Entry point shared by every object and session operation.
///
/// A client owns the current-user cache, so two clients never see each
/// other's session. Clones share everything.
///
/// # Example
///
/// ```rust
/// use nimbus_core::{Client, ClientConfig};
/// use nimbus_storage::InMemoryFileManager;
/// use nimbus_transport::MockExecutor;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let executor = Arc::new(MockExecutor::with_json(200, &json!({})));
/// let client = Client::builder(executor, Arc::new(InMemoryFileManager::new()))
///     .with_config(ClientConfig::new().with_automatic_user(true))
///     .build();
///
/// assert!(client.automatic_user_enabled());
/// assert!(client.current_user().is_none());
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Starts building a client.
    pub fn builder(
        executor: Arc<dyn RequestExecutor>,
        files: Arc<dyn LocalFileManager>,
    ) -> ClientBuilder {
        ClientBuilder {
            executor,
            files,
            config: ClientConfig::default(),
            dispatcher: None,
        }
    }

    /// Returns the configuration the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Allows `automatic_current_user` to create anonymous users.
    pub fn enable_automatic_user(&self) {
        self.inner.automatic_user.store(true, Ordering::SeqCst);
    }

    /// Forbids anonymous user creation.
    pub fn disable_automatic_user(&self) {
        self.inner.automatic_user.store(false, Ordering::SeqCst);
    }

    /// Returns true if anonymous user creation is allowed.
    pub fn automatic_user_enabled(&self) -> bool {
        self.inner.automatic_user.load(Ordering::SeqCst)
    }

    /// Returns the current user, restoring it from the slot on first use.
    pub fn current_user(&self) -> Option<SessionUser> {
        self.inner.cache.current()
    }

    /// Returns the session token of the current user.
    pub fn current_user_session_token(&self) -> Option<String> {
        self.inner.cache.session_token()
    }

    /// Replaces the in-memory current user without touching the slot.
    pub fn set_current_user(&self, user: Option<SessionUser>) {
        self.inner.cache.set(user);
    }

    /// Decodes the slot without changing the current user.
    ///
    /// Returns `None` for a missing slot or malformed content.
    pub fn load_current_user_from_storage(&self) -> Option<SessionUser> {
        self.inner.cache.load()
    }

    /// Writes `user` to the slot without changing the current user.
    ///
    /// # Errors
    ///
    /// Returns the storage error of the underlying file manager.
    pub fn persist_user(&self, user: &SessionUser) -> StorageResult<()> {
        self.inner.cache.persist(user)
    }

    /// Deletes the slot without changing the current user.
    ///
    /// # Errors
    ///
    /// Returns the storage error of the underlying file manager.
    pub fn delete_stored_user(&self) -> StorageResult<()> {
        self.inner.cache.delete()
    }

    pub(crate) fn cache(&self) -> &CurrentUserCache {
        &self.inner.cache
    }

    /// Sends a request on behalf of the current user.
    pub(crate) fn send(&self, request: Request) -> NimbusResult<Map<String, Value>> {
        let token = self.inner.cache.session_token();
        self.execute(request.with_session_token(token))
    }

    /// Sends a request without a session token.
    pub(crate) fn send_unscoped(&self, request: Request) -> NimbusResult<Map<String, Value>> {
        self.execute(request.with_session_token(None))
    }

    fn execute(&self, mut request: Request) -> NimbusResult<Map<String, Value>> {
        request.path = format!("{}/{}", self.inner.config.api_version, request.path);
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            scoped = request.session_token.is_some(),
            "sending request"
        );

        let response = self
            .inner
            .executor
            .execute(&request)
            .and_then(|response| response.error_for_status())
            .inspect_err(|e| {
                tracing::debug!(path = %request.path, error = %e, "request failed");
            })?;
        Ok(response.json_object()?)
    }

    pub(crate) fn dispatch<T, Op, Cb>(&self, op: Op, callback: Cb)
    where
        T: Send + 'static,
        Op: FnOnce() -> T + Send + 'static,
        Cb: FnOnce(T) + Send + 'static,
    {
        self.inner.dispatcher.spawn(op, callback);
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("automatic_user", &self.automatic_user_enabled())
            .field("dispatcher", &self.inner.dispatcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_storage::{InMemoryFileManager, StorageSlot};
    use nimbus_transport::{ExecutorError, Method, MockExecutor, Response};
    use serde_json::json;

    fn client(executor: &Arc<MockExecutor>, files: &Arc<InMemoryFileManager>) -> Client {
        Client::builder(executor.clone(), files.clone()).build()
    }

    #[test]
    fn prefixes_api_version() {
        let executor = Arc::new(MockExecutor::with_json(200, &json!({"a": 1})));
        let files = Arc::new(InMemoryFileManager::new());
        let client = Client::builder(executor.clone(), files)
            .with_config(ClientConfig::new().with_api_version("2020-01-01"))
            .build();

        let body = client
            .send_unscoped(Request::new(Method::Get, "classes/Todo/abc"))
            .unwrap();

        assert_eq!(body.get("a"), Some(&json!(1)));
        assert_eq!(executor.requests()[0].path, "2020-01-01/classes/Todo/abc");
    }

    #[test]
    fn scoped_request_carries_current_token() {
        let executor = Arc::new(MockExecutor::with_json(200, &json!({})));
        let files = Arc::new(InMemoryFileManager::with_data(
            StorageSlot::CurrentUser,
            r#"{"objectId":"abc","sessionToken":"ghijklmn"}"#,
        ));
        let client = client(&executor, &files);

        client.send(Request::new(Method::Get, "logout")).unwrap();
        client
            .send_unscoped(Request::new(Method::Get, "login"))
            .unwrap();

        let requests = executor.requests();
        assert_eq!(requests[0].session_token.as_deref(), Some("ghijklmn"));
        assert_eq!(requests[1].session_token, None);
    }

    #[test]
    fn error_status_becomes_transport_error() {
        let executor = Arc::new(MockExecutor::new(Ok(Response::new(
            401,
            r#"{"code":"E401002","error":"Authentication error by ID/Pass forbidden."}"#,
        ))));
        let files = Arc::new(InMemoryFileManager::new());
        let client = client(&executor, &files);

        let err = client
            .send_unscoped(Request::new(Method::Get, "login"))
            .unwrap_err();
        assert_eq!(
            err.as_transport(),
            Some(&ExecutorError::Server {
                status: 401,
                code: Some("E401002".into()),
                message: "Authentication error by ID/Pass forbidden.".into(),
            })
        );
    }

    #[test]
    fn non_object_body_is_decode_error() {
        let executor = Arc::new(MockExecutor::new(Ok(Response::new(200, "[]"))));
        let files = Arc::new(InMemoryFileManager::new());
        let client = client(&executor, &files);

        let err = client
            .send_unscoped(Request::new(Method::Get, "users/abc"))
            .unwrap_err();
        assert!(matches!(err.as_transport(), Some(ExecutorError::Decode(_))));
    }

    #[test]
    fn automatic_user_toggle() {
        let executor = Arc::new(MockExecutor::with_json(200, &json!({})));
        let files = Arc::new(InMemoryFileManager::new());
        let client = client(&executor, &files);

        assert!(!client.automatic_user_enabled());
        client.enable_automatic_user();
        assert!(client.clone().automatic_user_enabled());
        client.disable_automatic_user();
        assert!(!client.automatic_user_enabled());
    }

    #[test]
    fn raw_slot_bridge() {
        let executor = Arc::new(MockExecutor::with_json(200, &json!({})));
        let files = Arc::new(InMemoryFileManager::new());
        let client = client(&executor, &files);

        let snapshot = json!({"objectId": "abc", "userName": "u"});
        let user = SessionUser::from_snapshot(snapshot.as_object().cloned().unwrap());

        client.persist_user(&user).unwrap();
        assert!(client.current_user().is_some());
        let loaded = client.load_current_user_from_storage().unwrap();
        assert_eq!(loaded.user_name().as_deref(), Some("u"));

        client.set_current_user(None);
        client.delete_stored_user().unwrap();
        assert!(client.current_user().is_none());
        assert!(client.load_current_user_from_storage().is_none());
    }
}
