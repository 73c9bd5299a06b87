//! Session module
//!
//! Builds the authenticated HTTP client context used by a result stream.
//!
//! A `SessionContext` carries the bearer token, the fixed encoding and
//! user-agent headers, and any caller-supplied extra headers. Opening a
//! session performs no network I/O.

mod context;

pub use context::{make_session, SessionConfig, SessionContext, USER_AGENT_PRODUCT};
