//! Search configuration
//!
//! A flat mapping of query, credentials, budgets and endpoint, as handed
//! over by whatever loads the caller's configuration. Values may arrive as
//! strings, so numeric fields are coerced here.

use crate::error::{Error, Result};
use crate::params::{coerce_int, gen_request_parameters, RequestOptions, RequestPayload};
use crate::session::SessionConfig;
use crate::types::{JsonValue, StringMap};
use serde::Deserialize;

// ============================================================================
// Search Config
// ============================================================================

/// Flat search configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchConfig {
    /// Query text
    #[serde(default)]
    pub query: Option<String>,

    /// Search endpoint URL
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Extra headers sent with every request
    #[serde(default, alias = "extra_headers_dict")]
    pub extra_headers: Option<StringMap>,

    /// Results per call (page size)
    #[serde(default)]
    pub results_per_call: Option<JsonValue>,

    /// Start of the time window
    #[serde(default)]
    pub start_time: Option<String>,

    /// End of the time window
    #[serde(default)]
    pub end_time: Option<String>,

    /// Lower id bound
    #[serde(default)]
    pub since_id: Option<String>,

    /// Upper id bound
    #[serde(default)]
    pub until_id: Option<String>,

    /// Result budget
    #[serde(default, alias = "max_tweets")]
    pub max_results: Option<JsonValue>,

    /// Request budget
    #[serde(default, alias = "max_pages")]
    pub max_requests: Option<JsonValue>,

    /// Results per output file, for callers that shard output
    #[serde(default)]
    pub results_per_file: Option<JsonValue>,
}

impl SearchConfig {
    /// Parse from an already-loaded JSON mapping
    pub fn from_value(value: JsonValue) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Parse from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Session inputs carried by this config
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            bearer_token: self.bearer_token.clone(),
            extra_headers: self.extra_headers.clone().unwrap_or_default(),
            timeout: None,
        }
    }
}

// ============================================================================
// Result Stream Args
// ============================================================================

/// Everything needed to build a result stream
#[derive(Debug, Clone)]
pub struct ResultStreamArgs {
    /// Search endpoint URL
    pub endpoint: String,
    /// Session inputs
    pub session: SessionConfig,
    /// Request payload
    pub payload: RequestPayload,
    /// Result budget (None = unbounded)
    pub max_results: Option<u64>,
    /// Request budget (None = unbounded)
    pub max_requests: Option<u64>,
    /// Results per output file
    pub results_per_file: Option<u64>,
}

impl ResultStreamArgs {
    /// Create args with no budgets
    pub fn new(endpoint: impl Into<String>, session: SessionConfig, payload: RequestPayload) -> Self {
        Self {
            endpoint: endpoint.into(),
            session,
            payload,
            max_results: None,
            max_requests: None,
            results_per_file: None,
        }
    }
}

/// Build result stream arguments from a flat config.
///
/// `results_per_call` and `max_requests` must be integers (or numeric
/// strings) when present. A `max_results` that is absent or not an
/// integer leaves the result budget unbounded.
pub fn gen_params_from_config(config: &SearchConfig) -> Result<ResultStreamArgs> {
    let query = config
        .query
        .as_deref()
        .ok_or_else(|| Error::missing_field("query"))?;
    let endpoint = config
        .endpoint
        .clone()
        .ok_or_else(|| Error::missing_field("endpoint"))?;

    let results_per_call = intify("results_per_call", config.results_per_call.as_ref())?;
    let options = RequestOptions {
        results_per_call: results_per_call.map(JsonValue::from),
        start_time: config.start_time.clone(),
        end_time: config.end_time.clone(),
        since_id: config.since_id.clone(),
        until_id: config.until_id.clone(),
    };
    let payload = gen_request_parameters(query, &options)?;

    Ok(ResultStreamArgs {
        endpoint,
        session: config.session_config(),
        payload,
        max_results: config.max_results.as_ref().and_then(coerce_int),
        max_requests: intify("max_requests", config.max_requests.as_ref())?,
        results_per_file: intify("results_per_file", config.results_per_file.as_ref())?,
    })
}

fn intify(field: &str, value: Option<&JsonValue>) -> Result<Option<u64>> {
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(v) => coerce_int(v)
            .map(Some)
            .ok_or_else(|| Error::invalid_value(field, format!("expected a positive integer, got {v}"))),
    }
}
