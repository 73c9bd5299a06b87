//! HTTP module
//!
//! Issues one search request per page and wraps it with bounded retry.
//!
//! # Features
//!
//! - **Bounded Retries**: up to 3 attempts per logical call
//! - **Quadratic Backoff**: the n-th retry waits n² backoff units (1s by default)
//! - **Error Classification**: connection failures are never retried,
//!   a final rate-limited reply is handed back, every other failure is raised

mod client;
mod retry;

pub use client::{execute_request, request};
pub use retry::{extract_error_message, RetryPolicy};
