//! Request executor abstraction.

use crate::error::{ExecutorError, ExecutorResult};
use crate::request::{Request, Response};
use parking_lot::Mutex;
use serde_json::Value;

/// A request executor issues one request against the remote API.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (signed HTTP, loopback, mock for testing, etc.).
///
/// Implementations return the raw response for every status they
/// receive; mapping non-2xx statuses to errors is up to the caller.
pub trait RequestExecutor: Send + Sync {
    /// Executes `request` exactly once.
    fn execute(&self, request: &Request) -> ExecutorResult<Response>;
}

/// A mock executor for testing.
///
/// Replays one configured result for every request and records every
/// request it receives.
#[derive(Debug)]
pub struct MockExecutor {
    result: Mutex<ExecutorResult<Response>>,
    requests: Mutex<Vec<Request>>,
}

impl MockExecutor {
    /// Creates a mock that replays `result`.
    pub fn new(result: ExecutorResult<Response>) -> Self {
        Self {
            result: Mutex::new(result),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock answering every request with `status` and a JSON body.
    pub fn with_json(status: u16, body: &Value) -> Self {
        Self::new(Ok(Response::json(status, body)))
    }

    /// Creates a mock failing every request with `error`.
    pub fn failing(error: ExecutorError) -> Self {
        Self::new(Err(error))
    }

    /// Replaces the replayed result.
    pub fn set_result(&self, result: ExecutorResult<Response>) {
        *self.result.lock() = result;
    }

    /// Returns every request received so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Returns the number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl RequestExecutor for MockExecutor {
    fn execute(&self, request: &Request) -> ExecutorResult<Response> {
        self.requests.lock().push(request.clone());
        self.result.lock().clone()
    }
}
