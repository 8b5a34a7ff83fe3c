//! # Nimbus Transport
//!
//! Request executor abstraction and signed HTTP transport for the nimbus
//! client runtime.
//!
//! This crate provides:
//! - The [`Request`]/[`Response`] pair the object model speaks
//! - The [`RequestExecutor`] trait (one request in, one response out)
//! - A [`MockExecutor`] that records requests and replays a fixed result
//! - An [`HttpExecutor`] that signs requests and hands them to a
//!   pluggable [`HttpClient`]
//!
//! ## Key Invariants
//!
//! - One call to `execute` issues exactly one request
//! - No retries: failures are returned once, unmodified
//! - Deadlines belong to the [`HttpClient`], never to callers

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod executor;
mod http;
mod request;
mod signature;

pub use config::HttpConfig;
pub use error::{ExecutorError, ExecutorResult};
pub use executor::{MockExecutor, RequestExecutor};
pub use http::{HttpClient, HttpExecutor, HttpRequest, HttpResponse};
pub use request::{Method, Request, Response};
pub use signature::{encode_component, Signer, SIGNATURE_METHOD, SIGNATURE_VERSION};
