//! Request and response types exchanged with an executor.

use crate::error::{ExecutorError, ExecutorResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read.
    Get,
    /// Update.
    Put,
    /// Create or trigger.
    Post,
    /// Remove.
    Delete,
}

impl Method {
    /// Returns the upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request against the remote API.
///
/// `path` is relative to the service root and never starts with `/`
/// (e.g. `2013-09-01/users/abc`). Query items keep their insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the service root.
    pub path: String,
    /// Ordered query parameters.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Vec<u8>>,
    /// Session token scoping the request to a user.
    pub session_token: Option<String>,
}

impl Request {
    /// Creates a request with no query, body or session token.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            session_token: None,
        }
    }

    /// Appends a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the raw body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Serializes `value` as the JSON body.
    pub fn with_json(self, value: &Value) -> Self {
        // Serializing a `Value` cannot fail
        let body = serde_json::to_vec(value).unwrap_or_default();
        self.with_body(body)
    }

    /// Sets the session token.
    pub fn with_session_token(mut self, token: Option<String>) -> Self {
        self.session_token = token;
        self
    }

    /// Returns the first value for `key` in the query.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the body as UTF-8 text (lossy).
    pub fn body_text(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

/// A response returned by an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Raw body bytes (possibly empty).
    pub body: Vec<u8>,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<String>,
    error: Option<String>,
}

impl Response {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a response whose body is `value` serialized as JSON.
    pub fn json(status: u16, value: &Value) -> Self {
        Self::new(status, serde_json::to_vec(value).unwrap_or_default())
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Converts a non-2xx response into [`ExecutorError::Server`].
    ///
    /// The `{"code": ..., "error": ...}` body is used when present.
    pub fn error_for_status(self) -> ExecutorResult<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let parsed: Option<ErrorBody> = serde_json::from_slice(&self.body).ok();
        let (code, message) = match parsed {
            Some(ErrorBody { code, error }) => (
                code,
                error.unwrap_or_else(|| String::from_utf8_lossy(&self.body).into_owned()),
            ),
            None => (None, String::from_utf8_lossy(&self.body).into_owned()),
        };

        Err(ExecutorError::Server {
            status: self.status,
            code,
            message,
        })
    }

    /// Decodes the body as a JSON object.
    ///
    /// An empty body decodes to an empty object.
    pub fn json_object(&self) -> ExecutorResult<Map<String, Value>> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }

        match serde_json::from_slice::<Value>(&self.body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ExecutorError::decode(format!(
                "expected JSON object, got {}",
                type_name(&other)
            ))),
            Err(e) => Err(ExecutorError::decode(e.to_string())),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_builder() {
        let request = Request::new(Method::Get, "2013-09-01/login")
            .with_query("userName", "alice")
            .with_query("password", "secret")
            .with_session_token(Some("token".into()));

        assert_eq!(request.method, Method::Get);
        assert_eq!(request.query.len(), 2);
        assert_eq!(request.query[0].0, "userName");
        assert_eq!(request.query_value("password"), Some("secret"));
        assert_eq!(request.query_value("mailAddress"), None);
        assert!(request.body.is_none());
    }

    #[test]
    fn request_json_body() {
        let request = Request::new(Method::Post, "x").with_json(&json!({"mailAddress": "a@b.c"}));
        assert_eq!(
            request.body_text().as_deref(),
            Some("{\"mailAddress\":\"a@b.c\"}")
        );
    }

    #[test]
    fn method_names() {
        assert_eq!(Method::Put.as_str(), "PUT");
        assert_eq!(format!("{}", Method::Delete), "DELETE");
    }

    #[test]
    fn response_success_range() {
        assert!(Response::new(200, "").is_success());
        assert!(Response::new(201, "").is_success());
        assert!(!Response::new(404, "").is_success());
        assert!(!Response::new(302, "").is_success());
    }

    #[test]
    fn response_error_body() {
        let response = Response::new(404, r#"{"code":"E404001","error":"No data available."}"#);
        let err = response.error_for_status().unwrap_err();
        assert_eq!(
            err,
            ExecutorError::Server {
                status: 404,
                code: Some("E404001".into()),
                message: "No data available.".into(),
            }
        );
    }

    #[test]
    fn response_error_plain_body() {
        let err = Response::new(502, "Bad Gateway")
            .error_for_status()
            .unwrap_err();
        assert_eq!(
            err,
            ExecutorError::Server {
                status: 502,
                code: None,
                message: "Bad Gateway".into(),
            }
        );
    }

    #[test]
    fn response_json_object() {
        let response = Response::json(201, &json!({"objectId": "abc"}));
        let map = response.json_object().unwrap();
        assert_eq!(map["objectId"], json!("abc"));

        assert!(Response::new(200, "").json_object().unwrap().is_empty());
        assert!(matches!(
            Response::new(200, "[1,2]").json_object(),
            Err(ExecutorError::Decode(_))
        ));
        assert!(matches!(
            Response::new(200, "{not json").json_object(),
            Err(ExecutorError::Decode(_))
        ));
    }
}
