//! # Nimbus Core
//!
//! Client-side object model and session management for a mobile
//! backend-as-a-service.
//!
//! This crate provides:
//! - [`FieldStore`]: JSON fields with server-reserved keys hidden from the
//!   generic interface
//! - [`DirtyTracker`]: the minimal update payload since the last sync
//! - [`ModelObject`]: fetch, save and delete against a remote collection
//! - [`SessionUser`]: sign-up, log-in, log-out, mail requests and anonymous
//!   bootstrap
//! - [`Client`]: the executor, the current-user cache and background
//!   dispatch shared by all of the above
//!
//! ## Key Invariants
//!
//! - Reserved keys (`objectId`, `acl`, `createDate`, `updateDate`) never
//!   change through `set` or `remove`
//! - Operations without an object id fail before any request is issued
//! - A failed operation leaves fields, dirty set and cache untouched
//! - Every background callback runs exactly once
//! - At most one current user; it is persisted on every successful
//!   operation that touches it
//!
//! ## Example
//!
//! ```rust
//! use nimbus_core::{Client, LogInCredentials, SessionUser};
//! use nimbus_storage::InMemoryFileManager;
//! use nimbus_transport::MockExecutor;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let executor = Arc::new(MockExecutor::with_json(
//!     200,
//!     &json!({"objectId": "abc", "userName": "alice", "sessionToken": "token"}),
//! ));
//! let client = Client::builder(executor, Arc::new(InMemoryFileManager::new())).build();
//!
//! let user = SessionUser::log_in(&client, &LogInCredentials::user_name("alice", "secret"))?;
//! assert_eq!(user.session_token().as_deref(), Some("token"));
//! assert!(client.current_user().is_some());
//! # Ok::<(), nimbus_core::NimbusError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod client;
mod config;
mod dirty;
mod dispatch;
mod error;
mod fields;
mod object;
mod user;

pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, DEFAULT_API_VERSION};
pub use dirty::{DirtyTracker, FieldChange};
pub use dispatch::Dispatcher;
pub use error::{InvalidRequestError, NimbusError, NimbusResult};
pub use fields::{is_reserved, FieldStore, ACL, CREATE_DATE, OBJECT_ID, RESERVED_KEYS, UPDATE_DATE};
pub use object::{Endpoint, ModelObject};
pub use user::{
    LogInCredentials, SessionUser, AUTH_DATA, MAIL_ADDRESS, MAIL_ADDRESS_CONFIRM, PASSWORD,
    SESSION_TOKEN, TEMPORARY_PASSWORD, USER_NAME,
};
