//! Result stream types
//!
//! Configuration, state, counters and the response envelope used by the
//! result stream.

use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

/// Default result budget
pub const DEFAULT_MAX_RESULTS: u64 = 500;

/// Requests between session refreshes
pub const SESSION_REFRESH_INTERVAL: u64 = 20;

// ============================================================================
// Configuration
// ============================================================================

/// Budgets and policies for one result stream
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Maximum items to yield (None = unbounded)
    pub max_results: Option<u64>,
    /// Maximum requests to issue (None = unbounded)
    pub max_requests: Option<u64>,
    /// Requests between session refreshes
    pub session_refresh_interval: u64,
    /// Raise on malformed response bodies instead of ending the batch
    pub strict_parsing: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_results: Some(DEFAULT_MAX_RESULTS),
            max_requests: None,
            session_refresh_interval: SESSION_REFRESH_INTERVAL,
            strict_parsing: false,
        }
    }
}

impl StreamConfig {
    /// Create a new stream config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the result budget
    #[must_use]
    pub fn with_max_results(mut self, max: Option<u64>) -> Self {
        self.max_results = max;
        self
    }

    /// Set the request budget
    #[must_use]
    pub fn with_max_requests(mut self, max: Option<u64>) -> Self {
        self.max_requests = max;
        self
    }

    /// Set the session refresh interval
    #[must_use]
    pub fn with_session_refresh_interval(mut self, interval: u64) -> Self {
        self.session_refresh_interval = interval.max(1);
        self
    }

    /// Raise on malformed response bodies
    #[must_use]
    pub fn with_strict_parsing(mut self, strict: bool) -> Self {
        self.strict_parsing = strict;
        self
    }
}

// ============================================================================
// State
// ============================================================================

/// Lifecycle phase of a result stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamPhase {
    /// Not started
    #[default]
    Idle,
    /// Session open, no request issued yet
    SessionOpen,
    /// About to issue a request
    Requesting,
    /// Handing out items from the current batch
    Yielding,
    /// Finished; no further items
    Closed,
}

/// Mutable counters owned by a result stream
#[derive(Debug, Clone, Default)]
pub struct StreamState {
    /// Current phase
    pub phase: StreamPhase,
    /// Items yielded so far
    pub total_results: u64,
    /// Requests issued so far
    pub n_requests: u64,
    /// Cursor returned by the last response
    pub next_token: Option<String>,
    /// Items left in the current batch
    pub batch: VecDeque<Value>,
}

impl StreamState {
    /// Create fresh state
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current batch and cursor
    pub fn load(&mut self, envelope: ResponseEnvelope) {
        self.batch = envelope.data.into();
        self.next_token = envelope.meta.next_token.filter(|t| !t.is_empty());
    }

    /// Drop the current batch and cursor
    pub fn clear(&mut self) {
        self.batch.clear();
        self.next_token = None;
    }

    /// Whether the stream has finished
    pub fn is_closed(&self) -> bool {
        self.phase == StreamPhase::Closed
    }
}

/// Diagnostics for a result stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Requests issued
    pub requests: u64,
    /// Items yielded
    pub results: u64,
    /// Sessions opened, including refreshes
    pub sessions_opened: u64,
    /// Response bodies that failed to parse
    pub parse_failures: u64,
    /// Pagination ended on a rate-limited reply
    pub rate_limited: bool,
}

// ============================================================================
// Response Envelope
// ============================================================================

/// Parsed server reply
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseEnvelope {
    /// Result items in server order
    #[serde(default)]
    pub data: Vec<Value>,
    /// Pagination metadata
    #[serde(default)]
    pub meta: ResponseMeta,
}

/// Pagination metadata of a reply
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMeta {
    /// Cursor for the next page; absent on the final page
    #[serde(default)]
    pub next_token: Option<String>,
    /// Items in this page, as reported by the server
    #[serde(default)]
    pub result_count: Option<u64>,
}

impl ResponseEnvelope {
    /// Parse a response body
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }
}

// ============================================================================
// Request Counter
// ============================================================================

static GLOBAL_REQUEST_COUNTER: LazyLock<RequestCounter> = LazyLock::new(RequestCounter::new);

/// Shared count of requests issued across streams
///
/// Clones share the same count.
#[derive(Debug, Clone, Default)]
pub struct RequestCounter {
    count: Arc<AtomicU64>,
}

impl RequestCounter {
    /// Create an independent counter starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide counter used when none is injected
    pub fn global() -> Self {
        GLOBAL_REQUEST_COUNTER.clone()
    }

    /// Record one request, returning the new total
    pub fn increment(&self) -> u64 {
        self.count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current total
    pub fn get(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
