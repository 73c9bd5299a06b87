//! Session configuration and context

use crate::error::{Error, Result};
use crate::types::StringMap;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_ENCODING, AUTHORIZATION, USER_AGENT,
};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, info};

/// Product identifier sent in the user-agent header
pub const USER_AGENT_PRODUCT: &str = "searchtweets-rs";

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Inputs needed to open a session
#[derive(Clone, Default)]
pub struct SessionConfig {
    /// Bearer token for the search API
    pub bearer_token: Option<String>,
    /// Extra headers; these win over the fixed headers on collision
    pub extra_headers: StringMap,
    /// Transport timeout per request
    pub timeout: Option<Duration>,
}

impl SessionConfig {
    /// Create a config with a bearer token
    pub fn new(bearer_token: impl Into<String>) -> Self {
        Self {
            bearer_token: Some(bearer_token.into()),
            ..Default::default()
        }
    }

    /// Add an extra header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    /// Replace all extra headers
    #[must_use]
    pub fn with_extra_headers(mut self, headers: StringMap) -> Self {
        self.extra_headers = headers;
        self
    }

    /// Set the transport timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Check that credentials are present
    pub fn validate(&self) -> Result<()> {
        match self.bearer_token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(()),
            _ => {
                error!("No authentication information provided; please check your configuration");
                Err(Error::auth("no bearer token provided"))
            }
        }
    }

    /// Build the header set for a session
    pub fn headers(&self) -> Result<HeaderMap> {
        self.validate()?;
        let token = self.bearer_token.as_deref().unwrap_or_default();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        headers.insert(
            USER_AGENT,
            header_value(&format!(
                "{USER_AGENT_PRODUCT}/{}",
                env!("CARGO_PKG_VERSION")
            ))?,
        );

        let mut auth = header_value(&format!("Bearer {token}"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        for (key, value) in &self.extra_headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| Error::invalid_value("extra_headers", format!("{key}: {e}")))?;
            headers.insert(name, header_value(value)?);
        }

        Ok(headers)
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("has_bearer_token", &self.bearer_token.is_some())
            .field("extra_headers", &self.extra_headers.keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// An open, authenticated HTTP client context
///
/// Owned by exactly one result stream; closing consumes it.
pub struct SessionContext {
    id: u64,
    client: Client,
    headers: HeaderMap,
}

impl SessionContext {
    /// Open a session from a config
    pub fn open(config: &SessionConfig) -> Result<Self> {
        let headers = config.headers()?;

        // Proxy settings from the environment are ignored.
        let mut builder = Client::builder()
            .default_headers(headers.clone())
            .no_proxy();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        info!(session = id, "using bearer token for authentication");

        Ok(Self {
            id,
            client,
            headers,
        })
    }

    /// Unique id of this session within the process
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The configured client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Headers sent with every request
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Close the session, releasing its connection pool
    pub fn close(self) {
        debug!(session = self.id, "closing session");
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Open a session; fails when no bearer token is configured
pub fn make_session(config: &SessionConfig) -> Result<SessionContext> {
    SessionContext::open(config)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::invalid_value("headers", format!("invalid header value: {e}")))
}
