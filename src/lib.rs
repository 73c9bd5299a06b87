// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # searchtweets
//!
//! Paginated, retrying client for query-based search APIs, meant to be
//! embedded in larger data-collection tools.
//!
//! ## Features
//!
//! - **Request Building**: whitespace-normalized queries, flexible timestamp input
//! - **Cursor Pagination**: follows `meta.next_token` until a budget runs out
//! - **Bounded Retry**: three attempts with quadratic backoff
//! - **Session Rotation**: the HTTP session is replaced every 20 requests
//! - **Pluggable Decoding**: raw JSON, typed records, or an external decoder
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use searchtweets::params::{gen_request_parameters, RequestOptions};
//! use searchtweets::session::SessionConfig;
//! use searchtweets::stream::ResultStream;
//!
//! #[tokio::main]
//! async fn main() -> searchtweets::Result<()> {
//!     let payload = gen_request_parameters(
//!         "snow day has:media",
//!         &RequestOptions::new().results_per_call(100).start_time("2020-02-18"),
//!     )?;
//!
//!     let mut results = ResultStream::new(
//!         "https://api.twitter.com/2/tweets/search/recent",
//!         payload,
//!         SessionConfig::new("AAAA..."),
//!     )?
//!     .with_max_results(Some(1000))
//!     .stream();
//!
//!     while let Some(tweet) = results.next().await {
//!         println!("{}", tweet?["text"]);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ResultStream                          │
//! │   cursor · result budget · request budget · session refresh  │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//! ┌───────────┬───────────┬─────┴─────┬────────────┬────────────┐
//! │  Params   │ Endpoint  │  Session  │   Retry    │   Decode   │
//! ├───────────┼───────────┼───────────┼────────────┼────────────┤
//! │ Query     │ Search    │ Bearer    │ 3 attempts │ Identity   │
//! │ Timestamp │ Counts    │ Headers   │ n² backoff │ Typed      │
//! │ Config    │ Validate  │ Rotation  │ 429 passes │ External   │
//! └───────────┴───────────┴───────────┴────────────┴────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Request payload building
pub mod params;

/// Search/counts endpoint resolution
pub mod endpoint;

/// Authenticated HTTP sessions
pub mod session;

/// Single requests with bounded retry
pub mod http;

/// Item decoders
pub mod decode;

/// Paginated result streams
pub mod stream;

/// Flat search configuration
pub mod config;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{gen_params_from_config, ResultStreamArgs, SearchConfig};
pub use params::{gen_request_parameters, RequestOptions, RequestPayload};
pub use session::SessionConfig;
pub use stream::{collect_results, ResultStream};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
