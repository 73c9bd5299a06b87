//! Result stream module
//!
//! Turns one logical query into a lazy sequence of result items.
//!
//! # Overview
//!
//! The result stream issues one request at a time through the retry
//! policy, hands out the items of each page, and follows the server's
//! `next_token` cursor until one of the budgets runs out:
//!
//! ```text
//! Idle → SessionOpen → Requesting → Yielding → (Requesting | Closed)
//! ```
//!
//! - `max_results` - items yielded across all pages (default 500)
//! - `max_requests` - requests issued (default unbounded)
//!
//! The session is replaced every 20 requests and closed when the stream
//! ends or is abandoned.

mod types;

pub use types::{
    RequestCounter, ResponseEnvelope, ResponseMeta, StreamConfig, StreamPhase, StreamState,
    StreamStats, DEFAULT_MAX_RESULTS, SESSION_REFRESH_INTERVAL,
};

use crate::config::ResultStreamArgs;
use crate::decode::{IdentityDecoder, ItemDecoder};
use crate::endpoint::{change_to_count_endpoint, infer_endpoint, validate_count_api};
use crate::error::{Error, Result};
use crate::http::{self, RetryPolicy};
use crate::params::RequestPayload;
use crate::session::{make_session, SessionConfig, SessionContext};
use crate::types::EndpointKind;
use futures::Stream;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::fmt;
use std::pin::Pin;
use tracing::{debug, error, info, warn};
use url::Url;

/// Type alias for the item stream returned by [`ResultStream::stream`]
pub type ItemStream<T> = Pin<Box<dyn Stream<Item = Result<T>> + Send>>;

/// Paginated, retrying stream of results for one query
pub struct ResultStream<D: ItemDecoder = IdentityDecoder> {
    endpoint: String,
    kind: EndpointKind,
    payload: RequestPayload,
    session_config: SessionConfig,
    config: StreamConfig,
    retry: RetryPolicy,
    decoder: D,
    counter: RequestCounter,
    state: StreamState,
    stats: StreamStats,
    session: Option<SessionContext>,
}

impl ResultStream<IdentityDecoder> {
    /// Create a stream yielding raw JSON items.
    ///
    /// Payloads carrying a count bucket are pointed at the counts endpoint.
    /// Missing credentials and malformed endpoints fail here.
    pub fn new(endpoint: &str, payload: RequestPayload, session: SessionConfig) -> Result<Self> {
        session.validate()?;

        let kind = infer_endpoint(&payload);
        let endpoint = match kind {
            EndpointKind::Counts => change_to_count_endpoint(endpoint),
            EndpointKind::Search => endpoint.to_string(),
        };
        Url::parse(&endpoint)?;
        validate_count_api(&payload, &endpoint)?;

        Ok(Self {
            endpoint,
            kind,
            payload,
            session_config: session,
            config: StreamConfig::default(),
            retry: RetryPolicy::default(),
            decoder: IdentityDecoder,
            counter: RequestCounter::global(),
            state: StreamState::new(),
            stats: StreamStats::default(),
            session: None,
        })
    }

    /// Create a stream from config-derived arguments
    pub fn from_args(args: ResultStreamArgs) -> Result<Self> {
        let config = StreamConfig::new()
            .with_max_results(args.max_results)
            .with_max_requests(args.max_requests);
        Ok(Self::new(&args.endpoint, args.payload, args.session)?.with_config(config))
    }
}

impl<D: ItemDecoder> ResultStream<D> {
    /// Decode items with `decoder` instead of the current one
    pub fn with_decoder<E: ItemDecoder>(self, decoder: E) -> ResultStream<E> {
        ResultStream {
            endpoint: self.endpoint,
            kind: self.kind,
            payload: self.payload,
            session_config: self.session_config,
            config: self.config,
            retry: self.retry,
            decoder,
            counter: self.counter,
            state: self.state,
            stats: self.stats,
            session: self.session,
        }
    }

    /// Set stream configuration
    #[must_use]
    pub fn with_config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the result budget (None = unbounded)
    #[must_use]
    pub fn with_max_results(mut self, max: Option<u64>) -> Self {
        self.config.max_results = max;
        self
    }

    /// Set the request budget (None = unbounded)
    #[must_use]
    pub fn with_max_requests(mut self, max: Option<u64>) -> Self {
        self.config.max_requests = max;
        self
    }

    /// Set the retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Count requests on `counter` instead of the process-wide one
    #[must_use]
    pub fn with_counter(mut self, counter: RequestCounter) -> Self {
        self.counter = counter;
        self
    }

    /// Resolved endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Endpoint kind inferred from the payload
    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// Current payload, including the latest cursor
    pub fn payload(&self) -> &RequestPayload {
        &self.payload
    }

    /// Stream configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Current state
    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Diagnostics
    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Produce the next item, or `None` once the stream has ended.
    ///
    /// An `Err` ends the stream, except that parse errors are only
    /// raised in strict mode.
    pub async fn next_result(&mut self) -> Option<Result<D::Item>> {
        loop {
            match self.state.phase {
                StreamPhase::Closed => return None,
                StreamPhase::Idle => {
                    if self.results_exhausted() || self.requests_exhausted() {
                        self.finish();
                        continue;
                    }
                    info!(endpoint = %self.endpoint, kind = %self.kind, "starting stream");
                    if let Err(e) = self.open_session() {
                        self.finish();
                        return Some(Err(e));
                    }
                    self.state.phase = StreamPhase::SessionOpen;
                }
                StreamPhase::SessionOpen | StreamPhase::Requesting => {
                    if let Err(e) = self.execute_request().await {
                        self.finish();
                        return Some(Err(e));
                    }
                    self.state.phase = StreamPhase::Yielding;
                }
                StreamPhase::Yielding => {
                    if self.results_exhausted() {
                        self.finish();
                        continue;
                    }

                    if let Some(raw) = self.state.batch.pop_front() {
                        let decoded = self.decoder.decode(raw);
                        match decoded {
                            Ok(_) => {
                                self.state.total_results += 1;
                                self.stats.results += 1;
                            }
                            Err(_) => self.finish(),
                        }
                        return Some(decoded);
                    }

                    if self.should_continue() {
                        if let Some(token) = self.state.next_token.take() {
                            self.payload.set_next_token(token);
                        }
                        info!(
                            "paging; total requests read so far: {}",
                            self.state.n_requests
                        );
                        self.state.phase = StreamPhase::Requesting;
                    } else {
                        self.finish();
                    }
                }
            }
        }
    }

    /// Stop the stream early and close its session
    pub fn close(&mut self) {
        self.finish();
    }

    /// Drain the remaining items into a `Vec`
    pub async fn collect(mut self) -> Result<Vec<D::Item>> {
        let mut items = Vec::new();
        while let Some(item) = self.next_result().await {
            items.push(item?);
        }
        Ok(items)
    }

    /// Convert into a `futures::Stream` of items
    pub fn stream(self) -> ItemStream<D::Item>
    where
        D: 'static,
        D::Item: 'static,
    {
        Box::pin(futures::stream::unfold(self, |mut rs| async move {
            rs.next_result().await.map(|item| (item, rs))
        }))
    }

    fn results_exhausted(&self) -> bool {
        self.config
            .max_results
            .is_some_and(|max| self.state.total_results >= max)
    }

    fn requests_exhausted(&self) -> bool {
        self.config
            .max_requests
            .is_some_and(|max| self.state.n_requests >= max)
    }

    fn should_continue(&self) -> bool {
        self.state.next_token.is_some() && !self.results_exhausted() && !self.requests_exhausted()
    }

    fn open_session(&mut self) -> Result<()> {
        let stale = self.session.take();
        self.session = Some(self.replace_session(stale)?);
        Ok(())
    }

    fn replace_session(&mut self, stale: Option<SessionContext>) -> Result<SessionContext> {
        if let Some(old) = stale {
            old.close();
        }
        let session = make_session(&self.session_config)?;
        self.stats.sessions_opened += 1;
        Ok(session)
    }

    async fn execute_request(&mut self) -> Result<()> {
        let n = self.state.n_requests;
        let interval = self.config.session_refresh_interval.max(1);
        let refresh = n > 1 && n % interval == 0;
        if refresh {
            info!("refreshing session");
        }
        let session = match self.session.take() {
            Some(session) if !refresh => session,
            stale => self.replace_session(stale)?,
        };

        let sent =
            http::execute_request(&self.retry, &session, &self.endpoint, &self.payload).await;
        self.session = Some(session);
        let response = sent?;
        self.state.n_requests += 1;
        self.stats.requests += 1;
        let process_total = self.counter.increment();
        debug!(
            requests = self.state.n_requests,
            process_total, "request completed"
        );

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            warn!("rate limited; ending pagination with an empty batch");
            self.stats.rate_limited = true;
            self.state.clear();
            return Ok(());
        }

        let body = response.bytes().await?;
        match ResponseEnvelope::from_slice(&body) {
            Ok(envelope) => {
                debug!(
                    items = envelope.data.len(),
                    result_count = ?envelope.meta.result_count,
                    has_next = envelope.meta.next_token.is_some(),
                    "received batch"
                );
                self.state.load(envelope);
            }
            Err(e) => {
                self.stats.parse_failures += 1;
                self.state.clear();
                if self.config.strict_parsing {
                    return Err(Error::parse(e.to_string()));
                }
                error!("Error parsing content as JSON: {e}");
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        if self.state.is_closed() {
            return;
        }
        info!("ending stream at {} results", self.state.total_results);
        self.state.batch.clear();
        if let Some(session) = self.session.take() {
            session.close();
        }
        self.state.phase = StreamPhase::Closed;
    }

    fn summary(&self) -> Value {
        json!({
            "endpoint": self.endpoint,
            "request_parameters": self.payload.to_value(),
            "decoder": self.decoder.name(),
            "max_results": self.config.max_results,
        })
    }
}

impl<D: ItemDecoder> fmt::Display for ResultStream<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = serde_json::to_string_pretty(&self.summary()).map_err(|_| fmt::Error)?;
        write!(f, "ResultStream: \n\t{summary}")
    }
}

impl<D: ItemDecoder> fmt::Debug for ResultStream<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultStream")
            .field("endpoint", &self.endpoint)
            .field("kind", &self.kind)
            .field("payload", &self.payload)
            .field("config", &self.config)
            .field("phase", &self.state.phase)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Collect up to `max_results` raw items for `payload` without keeping
/// the stream around.
pub async fn collect_results(
    payload: RequestPayload,
    max_results: Option<u64>,
    args: ResultStreamArgs,
) -> Result<Vec<Value>> {
    ResultStream::new(&args.endpoint, payload, args.session)?
        .with_config(
            StreamConfig::new()
                .with_max_results(max_results)
                .with_max_requests(args.max_requests),
        )
        .collect()
        .await
}

#[cfg(test)]
mod tests;
