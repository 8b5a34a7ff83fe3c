//! Error types for request execution.

use thiserror::Error;

/// Result type for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Errors produced while executing a request.
///
/// These are forwarded to callers verbatim, so they are `Clone` and
/// comparable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("server error {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Application error code from the body (e.g. `E404001`), if any.
        code: Option<String>,
        /// Human readable message.
        message: String,
    },

    /// A well-formed response had an unexpected shape.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ExecutorError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Returns the HTTP status for server errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ExecutorError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ExecutorError::network("connection reset");
        assert_eq!(err.to_string(), "network error: connection reset");

        let err = ExecutorError::Server {
            status: 404,
            code: Some("E404001".into()),
            message: "No data available.".into(),
        };
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("No data available."));
    }

    #[test]
    fn error_status() {
        assert_eq!(ExecutorError::decode("bad").status(), None);
        let err = ExecutorError::Server {
            status: 401,
            code: None,
            message: String::new(),
        };
        assert_eq!(err.status(), Some(401));
    }
}
