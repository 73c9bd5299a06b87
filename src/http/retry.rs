//! Retry wrapper for a single logical request
//!
//! Provides a retry policy that handles:
//! - Bounded attempts with quadratic backoff
//! - Immediate failure on connection errors
//! - Rate-limit fallthrough after the final attempt
//! - Error message extraction from JSON error bodies

use crate::error::{Error, Result};
use crate::params::RequestPayload;
use reqwest::{Response, StatusCode};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Retry policy for one logical call
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay unit; retry `n` waits `n² × backoff_unit`
    pub backoff_unit: Duration,
    /// Raise `Error::RateLimited` instead of returning the final 429 reply
    pub strict_rate_limit: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
            strict_rate_limit: false,
        }
    }
}

impl RetryPolicy {
    /// Create the default policy (3 attempts, 1s unit)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set total attempts
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the backoff unit
    #[must_use]
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Raise on a final rate-limited reply
    #[must_use]
    pub fn with_strict_rate_limit(mut self, strict: bool) -> Self {
        self.strict_rate_limit = strict;
        self
    }

    /// Delay before retry number `retry` (1-based)
    pub fn calculate_backoff(&self, retry: u32) -> Duration {
        self.backoff_unit.saturating_mul(retry.saturating_pow(2))
    }

    /// Run `call` until it succeeds or attempts run out.
    ///
    /// `payload` is only used for diagnostics on the final failure.
    pub async fn execute<F, Fut>(&self, payload: &RequestPayload, mut call: F) -> Result<Response>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = reqwest::Result<Response>>,
    {
        let mut attempt = 1;

        loop {
            let response = call().await.map_err(|e| {
                error!("Connection error for session; exiting: {e}");
                Error::Connection(e)
            })?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if attempt < self.max_attempts {
                let delay = self.calculate_backoff(attempt);
                warn!(
                    "retrying request; current status code: {}, attempt {}/{}, waiting {:?}",
                    status.as_u16(),
                    attempt,
                    self.max_attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!("Request rate limit hit after {attempt} attempts");
                if self.strict_rate_limit {
                    return Err(Error::RateLimited {
                        status: status.as_u16(),
                    });
                }
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body);
            error!(
                "HTTP Error code: {}: {}",
                status.as_u16(),
                message.as_deref().unwrap_or("<no message>")
            );
            error!("Request payload: {}", payload.to_value());
            return Err(Error::protocol(
                status.as_u16(),
                message,
                payload.to_value(),
            ));
        }
    }
}

/// Pull a human-readable message out of a JSON error body.
///
/// Looks at `error.message` first, then the top-level `detail` and
/// `title` fields used by newer API versions.
pub fn extract_error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    ["/error/message", "/detail", "/title"]
        .iter()
        .find_map(|pointer| json.pointer(pointer).and_then(Value::as_str))
        .map(str::to_string)
}
