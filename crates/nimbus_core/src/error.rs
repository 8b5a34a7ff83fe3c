//! Error types for the object model.

use nimbus_transport::ExecutorError;
use thiserror::Error;

/// Result type for object and session operations.
pub type NimbusResult<T> = Result<T, NimbusError>;

/// Errors surfaced by object and session operations.
///
/// Every operation either commits fully or leaves local state untouched;
/// the error says which precondition or round trip failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NimbusError {
    /// The executor failed or the server rejected the request.
    #[error("transport error: {0}")]
    Transport(#[from] ExecutorError),

    /// The request could not be built from local state.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] InvalidRequestError),

    /// Anonymous bootstrap was requested while automatic users are disabled.
    #[error("automatic user is not available")]
    AutomaticUserNotAvailable,
}

/// Local preconditions checked before any request is issued.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidRequestError {
    /// The object has no object id yet.
    #[error("object id is empty")]
    EmptyObjectId,
}

impl NimbusError {
    /// Returns the transport error, if this is one.
    pub fn as_transport(&self) -> Option<&ExecutorError> {
        match self {
            NimbusError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = NimbusError::from(InvalidRequestError::EmptyObjectId);
        assert_eq!(err.to_string(), "invalid request: object id is empty");

        let err = NimbusError::AutomaticUserNotAvailable;
        assert_eq!(err.to_string(), "automatic user is not available");
    }

    #[test]
    fn transport_errors_are_forwarded_verbatim() {
        let inner = ExecutorError::network("offline");
        let err = NimbusError::from(inner.clone());
        assert_eq!(err.as_transport(), Some(&inner));
        assert!(NimbusError::AutomaticUserNotAvailable.as_transport().is_none());
    }
}
