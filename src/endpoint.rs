//! Endpoint resolution
//!
//! Classifies a payload as a search or counts request and rewrites
//! endpoint URLs to the counts resource. Pure string inspection, no I/O.

use crate::error::{Error, Result};
use crate::params::RequestPayload;
use crate::types::EndpointKind;
use regex::Regex;
use std::sync::LazyLock;
use tracing::error;
use url::Url;

/// Final path segment of a counts endpoint, without extension
pub const COUNTS_RESOURCE: &str = "counts";

/// Separator set used to tokenize scheme-less endpoints
static ENDPOINT_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[/:]").unwrap());

/// Infer which endpoint kind a payload targets.
///
/// A payload carrying a count bucket is a counts request.
pub fn infer_endpoint(payload: &RequestPayload) -> EndpointKind {
    if payload.bucket.is_some() {
        EndpointKind::Counts
    } else {
        EndpointKind::Search
    }
}

/// Rewrite an endpoint to its `counts` resource.
///
/// The extension of the final path segment is dropped and `counts.json`
/// appended. Endpoints already ending in the counts resource are returned
/// unchanged, so applying this twice equals applying it once.
///
/// ```
/// use searchtweets::endpoint::change_to_count_endpoint;
///
/// let url = "https://api.twitter.com/1.1/tweets/search/30day/dev.json";
/// assert_eq!(
///     change_to_count_endpoint(url),
///     "https://api.twitter.com/1.1/tweets/search/30day/dev/counts.json"
/// );
/// ```
pub fn change_to_count_endpoint(endpoint: &str) -> String {
    if let Ok(mut url) = Url::parse(endpoint) {
        if !url.cannot_be_a_base() {
            let mut segments: Vec<String> = url
                .path_segments()
                .map(|s| s.filter(|p| !p.is_empty()).map(str::to_string).collect())
                .unwrap_or_default();

            if let Some(last) = segments.last_mut() {
                let stem = strip_extension(last).to_string();
                if stem == COUNTS_RESOURCE {
                    return endpoint.to_string();
                }
                *last = stem;
            }
            segments.push(format!("{COUNTS_RESOURCE}.json"));

            url.set_path(&format!("/{}", segments.join("/")));
            return url.to_string();
        }
    }

    let mut tokens: Vec<String> = ENDPOINT_SEPARATORS
        .split(endpoint)
        .filter(|t| !t.is_empty() && *t != "https" && *t != "http")
        .map(str::to_string)
        .collect();

    if let Some(last) = tokens.last_mut() {
        let stem = strip_extension(last).to_string();
        if stem == COUNTS_RESOURCE {
            return endpoint.to_string();
        }
        *last = stem;
    }

    format!("https://{}/{COUNTS_RESOURCE}.json", tokens.join("/"))
}

/// Ensure a payload with a count bucket targets the counts endpoint.
pub fn validate_count_api(payload: &RequestPayload, endpoint: &str) -> Result<()> {
    if payload.bucket.is_none() || is_count_endpoint(endpoint) {
        return Ok(());
    }

    let message = format!(
        "payload has a count bucket but endpoint '{endpoint}' is not the counts API; \
         check your endpoint and try again"
    );
    error!("{message}");
    Err(Error::validation(message))
}

/// Whether the endpoint's final path segment is the counts resource
pub fn is_count_endpoint(endpoint: &str) -> bool {
    let path = endpoint.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .is_some_and(|last| strip_extension(last) == COUNTS_RESOURCE)
}

fn strip_extension(segment: &str) -> &str {
    segment.split('.').next().unwrap_or(segment)
}
