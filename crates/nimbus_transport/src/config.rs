//! Configuration for the HTTP executor.

use std::time::Duration;

/// Default service root.
pub(crate) const DEFAULT_BASE_URL: &str = "https://mbaas.api.nifcloud.com";

/// Credentials and endpoint settings for [`crate::HttpExecutor`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Application key sent with every request.
    pub application_key: String,
    /// Client key used to sign requests. Never sent over the wire.
    pub client_key: String,
    /// Service root (scheme and host, no trailing slash).
    pub base_url: String,
    /// Deadline handed to the [`crate::HttpClient`].
    pub timeout: Duration,
}

impl HttpConfig {
    /// Creates a new configuration for the default service root.
    pub fn new(application_key: impl Into<String>, client_key: impl Into<String>) -> Self {
        Self {
            application_key: application_key.into(),
            client_key: client_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Sets the service root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
