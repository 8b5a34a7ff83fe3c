//! HTTP executor implementation.
//!
//! This module turns a [`Request`] into a signed HTTP exchange. The actual
//! HTTP client is abstracted via a trait to allow different implementations
//! (reqwest, hyper, ureq, etc.).

use crate::config::HttpConfig;
use crate::error::{ExecutorError, ExecutorResult};
use crate::executor::RequestExecutor;
use crate::request::{Method, Request, Response};
use crate::signature::{encode_component, Signer};
use chrono::Utc;
use std::time::Duration;

/// A fully prepared HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including the encoded query string.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Body bytes, if any.
    pub body: Option<Vec<u8>>,
    /// Deadline for the exchange.
    pub timeout: Duration,
}

impl HttpRequest {
    /// Returns the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body bytes.
    pub body: Vec<u8>,
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport.
pub trait HttpClient: Send + Sync {
    /// Sends the request and returns the response for any status.
    ///
    /// Returns `Err` only if no response was received.
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// Signed HTTP request executor.
pub struct HttpExecutor<C: HttpClient> {
    config: HttpConfig,
    signer: Signer,
    fqdn: String,
    client: C,
}

impl<C: HttpClient> HttpExecutor<C> {
    /// Creates a new HTTP executor.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL has no host.
    pub fn new(config: HttpConfig, client: C) -> ExecutorResult<Self> {
        let url = url::Url::parse(&config.base_url)
            .map_err(|e| ExecutorError::network(format!("invalid base URL: {e}")))?;
        let fqdn = url
            .host_str()
            .ok_or_else(|| ExecutorError::network("base URL has no host"))?
            .to_string();
        let signer = Signer::new(config.application_key.clone(), config.client_key.clone());

        Ok(Self {
            config,
            signer,
            fqdn,
            client,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Returns the host used in signatures.
    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    /// Builds the signed HTTP request for `request` at `timestamp`.
    pub fn prepare(&self, request: &Request, timestamp: &str) -> HttpRequest {
        let path = format!("/{}", request.path.trim_start_matches('/'));

        let mut url = format!("{}{}", self.config.base_url, path);
        if !request.query.is_empty() {
            let query = request
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
                .collect::<Vec<_>>()
                .join("&");
            url.push('?');
            url.push_str(&query);
        }

        let signature =
            self.signer
                .sign(request.method, &self.fqdn, &path, &request.query, timestamp);

        let mut headers = vec![
            (
                "X-NCMB-Application-Key".to_string(),
                self.config.application_key.clone(),
            ),
            ("X-NCMB-Signature".to_string(), signature),
            ("X-NCMB-Timestamp".to_string(), timestamp.to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        if let Some(token) = &request.session_token {
            headers.push(("X-NCMB-Apps-Session-Token".to_string(), token.clone()));
        }

        HttpRequest {
            method: request.method,
            url,
            headers,
            body: request.body.clone(),
            timeout: self.config.timeout,
        }
    }
}

/// Formats the current time the way the signature header expects.
fn timestamp_now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

impl<C: HttpClient> RequestExecutor for HttpExecutor<C> {
    fn execute(&self, request: &Request) -> ExecutorResult<Response> {
        let http_request = self.prepare(request, &timestamp_now());
        tracing::debug!(method = %http_request.method, url = %http_request.url, "sending request");

        let response = self
            .client
            .send(http_request)
            .map_err(ExecutorError::Network)?;

        tracing::debug!(status = response.status, "received response");
        Ok(Response::new(response.status, response.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct TestClient {
        response: Mutex<Result<HttpResponse, String>>,
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl TestClient {
        fn new(response: Result<HttpResponse, String>) -> Self {
            Self {
                response: Mutex::new(response),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpClient for TestClient {
        fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
            self.sent.lock().push(request);
            self.response.lock().clone()
        }
    }

    fn executor(client: TestClient) -> HttpExecutor<TestClient> {
        HttpExecutor::new(HttpConfig::new("app-key", "client-key"), client).unwrap()
    }

    #[test]
    fn executor_creation() {
        let executor = executor(TestClient::new(Err("unused".into())));
        assert_eq!(executor.fqdn(), "mbaas.api.nifcloud.com");
        assert_eq!(executor.config().application_key, "app-key");
    }

    #[test]
    fn executor_rejects_bad_base_url() {
        let config = HttpConfig::new("a", "c").with_base_url("not a url");
        let result = HttpExecutor::new(config, TestClient::new(Err("unused".into())));
        assert!(matches!(result, Err(ExecutorError::Network(_))));
    }

    #[test]
    fn prepare_builds_url_and_headers() {
        let executor = executor(TestClient::new(Err("unused".into())));
        let request = Request::new(Method::Get, "2013-09-01/login")
            .with_query("userName", "Yamada Tarou")
            .with_query("password", "abcd1234")
            .with_session_token(Some("token-1".into()));

        let prepared = executor.prepare(&request, "2013-12-02T02:44:35.452Z");

        assert_eq!(
            prepared.url,
            "https://mbaas.api.nifcloud.com/2013-09-01/login?userName=Yamada%20Tarou&password=abcd1234"
        );
        assert_eq!(prepared.header("x-ncmb-application-key"), Some("app-key"));
        assert_eq!(
            prepared.header("X-NCMB-Timestamp"),
            Some("2013-12-02T02:44:35.452Z")
        );
        assert_eq!(prepared.header("X-NCMB-Apps-Session-Token"), Some("token-1"));
        assert!(prepared.header("X-NCMB-Signature").is_some());
        assert!(prepared.body.is_none());
    }

    #[test]
    fn prepare_without_session_token() {
        let executor = executor(TestClient::new(Err("unused".into())));
        let request = Request::new(Method::Post, "2013-09-01/users").with_body(b"{}".to_vec());

        let prepared = executor.prepare(&request, "2013-12-02T02:44:35.452Z");
        assert_eq!(prepared.url, "https://mbaas.api.nifcloud.com/2013-09-01/users");
        assert!(prepared.header("X-NCMB-Apps-Session-Token").is_none());
        assert_eq!(prepared.body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn execute_passes_status_through() {
        let executor = executor(TestClient::new(Ok(HttpResponse {
            status: 404,
            body: b"{}".to_vec(),
        })));

        let response = executor
            .execute(&Request::new(Method::Get, "2013-09-01/users/x"))
            .unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(executor.client.sent.lock().len(), 1);
    }

    #[test]
    fn execute_network_failure() {
        let executor = executor(TestClient::new(Err("connection refused".into())));
        let result = executor.execute(&Request::new(Method::Get, "2013-09-01/logout"));
        assert_eq!(
            result,
            Err(ExecutorError::Network("connection refused".into()))
        );
    }

    #[test]
    fn timestamp_format() {
        let ts = timestamp_now();
        assert_eq!(ts.len(), "2013-12-02T02:44:35.452Z".len());
        assert!(ts.ends_with('Z'));
    }
}
