//! Request payload and the builder that produces it

use super::time::convert_utc_time;
use crate::error::{Error, Result};
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};

/// Normalized request payload for one logical query
///
/// Every present field is sent as a query parameter. `next_token` is
/// filled in by the result stream once pagination begins.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestPayload {
    /// Whitespace-normalized query text
    pub query: String,
    /// Results per call (page size)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u64>,
    /// Inclusive lower time bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// Exclusive upper time bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Return results newer than this id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since_id: Option<String>,
    /// Return results older than this id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until_id: Option<String>,
    /// Count bucket; marks a counts request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// Continuation cursor returned by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl RequestPayload {
    /// Create a payload for a query, collapsing all whitespace runs
    pub fn new(query: &str) -> Result<Self> {
        let query = normalize_query(query);
        if query.is_empty() {
            return Err(Error::validation("query must not be empty"));
        }
        Ok(Self {
            query,
            ..Default::default()
        })
    }

    /// Parse a payload from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        let mut payload: Self = serde_json::from_str(json)?;
        payload.query = normalize_query(&payload.query);
        if payload.query.is_empty() {
            return Err(Error::missing_field("query"));
        }
        Ok(payload)
    }

    /// Serialize to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// JSON value used in diagnostics
    pub fn to_value(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    /// Set the page size
    #[must_use]
    pub fn with_max_results(mut self, max_results: u64) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Set the count bucket
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Merge a continuation cursor, replacing any previous one
    pub fn set_next_token(&mut self, token: impl Into<String>) {
        self.next_token = Some(token.into());
    }

    /// Query parameters in a stable order
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("query", self.query.clone())];
        if let Some(max_results) = self.max_results {
            pairs.push(("max_results", max_results.to_string()));
        }
        let optional = [
            ("start_time", &self.start_time),
            ("end_time", &self.end_time),
            ("since_id", &self.since_id),
            ("until_id", &self.until_id),
            ("bucket", &self.bucket),
            ("next_token", &self.next_token),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                pairs.push((key, value.clone()));
            }
        }
        pairs
    }
}

/// Optional inputs for [`gen_request_parameters`]
///
/// Fields stay loosely typed: `results_per_call` may be a number or a
/// numeric string, timestamps may use any accepted shape.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Results per call; dropped unless it is a positive integer
    pub results_per_call: Option<JsonValue>,
    /// Start of the time window
    pub start_time: Option<String>,
    /// End of the time window
    pub end_time: Option<String>,
    /// Lower id bound
    pub since_id: Option<String>,
    /// Upper id bound
    pub until_id: Option<String>,
}

impl RequestOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set results per call
    #[must_use]
    pub fn results_per_call(mut self, value: impl Into<JsonValue>) -> Self {
        self.results_per_call = Some(value.into());
        self
    }

    /// Set the start time
    #[must_use]
    pub fn start_time(mut self, value: impl Into<String>) -> Self {
        self.start_time = Some(value.into());
        self
    }

    /// Set the end time
    #[must_use]
    pub fn end_time(mut self, value: impl Into<String>) -> Self {
        self.end_time = Some(value.into());
        self
    }

    /// Set the since id
    #[must_use]
    pub fn since_id(mut self, value: impl Into<String>) -> Self {
        self.since_id = Some(value.into());
        self
    }

    /// Set the until id
    #[must_use]
    pub fn until_id(mut self, value: impl Into<String>) -> Self {
        self.until_id = Some(value.into());
        self
    }
}

/// Build a normalized request payload.
///
/// Time bounds and id bounds are not checked against each other.
///
/// ```
/// use searchtweets::params::{gen_request_parameters, RequestOptions};
///
/// let payload = gen_request_parameters(
///     "beyonce\n  has:geo",
///     &RequestOptions::new()
///         .results_per_call(100)
///         .start_time("2020-02-18"),
/// )
/// .unwrap();
///
/// assert_eq!(payload.query, "beyonce has:geo");
/// assert_eq!(payload.max_results, Some(100));
/// assert_eq!(payload.start_time.as_deref(), Some("2020-02-18T00:00:00Z"));
/// ```
pub fn gen_request_parameters(query: &str, options: &RequestOptions) -> Result<RequestPayload> {
    let mut payload = RequestPayload::new(query)?;

    payload.max_results = options.results_per_call.as_ref().and_then(coerce_int);
    payload.start_time = normalize_time(options.start_time.as_deref())?;
    payload.end_time = normalize_time(options.end_time.as_deref())?;
    payload.since_id = non_empty(options.since_id.as_deref());
    payload.until_id = non_empty(options.until_id.as_deref());

    Ok(payload)
}

/// Coerce a loosely-typed value to a positive integer.
///
/// Accepts JSON integers and strings holding an integer.
pub fn coerce_int(value: &JsonValue) -> Option<u64> {
    let parsed = match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.filter(|n| *n > 0)
}

fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_time(value: Option<&str>) -> Result<Option<String>> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => convert_utc_time(v).map(Some),
        _ => Ok(None),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
