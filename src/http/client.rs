//! Single-page search request

use super::retry::RetryPolicy;
use crate::error::Result;
use crate::params::RequestPayload;
use crate::session::SessionContext;
use reqwest::Response;
use tracing::debug;

/// Send one GET for `payload`, carrying every field as a query parameter.
///
/// Transport errors are returned as-is; status handling is left to the
/// retry policy.
pub async fn request(
    session: &SessionContext,
    url: &str,
    payload: &RequestPayload,
) -> reqwest::Result<Response> {
    debug!(session = session.id(), "sending request to {url}");
    session
        .client()
        .get(url)
        .query(&payload.query_pairs())
        .send()
        .await
}

/// Send one request for `payload` through `policy`
pub async fn execute_request(
    policy: &RetryPolicy,
    session: &SessionContext,
    url: &str,
    payload: &RequestPayload,
) -> Result<Response> {
    policy
        .execute(payload, || request(session, url, payload))
        .await
}
