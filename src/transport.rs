//! Lazily constructed HTTP transport shared by the API client and the file downloader.
//!
//! Each component owns one [`LazyTransport`]. The underlying reqwest client is
//! built on the first request and dropped by [`LazyTransport::release`], which
//! the orchestrator calls on every exit path.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default total timeout for metadata requests (30 seconds).
pub const API_READ_TIMEOUT_SECS: u64 = 30;

/// Default total timeout for file transfers (5 minutes for large files).
pub const FILE_READ_TIMEOUT_SECS: u64 = 300;

/// Connect/read timeouts for one transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// TCP/TLS connect timeout.
    pub connect: Duration,
    /// Whole-request timeout, body included.
    pub read: Duration,
}

impl HttpTimeouts {
    /// Timeouts for small JSON metadata requests.
    #[must_use]
    pub fn api() -> Self {
        Self {
            connect: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read: Duration::from_secs(API_READ_TIMEOUT_SECS),
        }
    }

    /// Timeouts for file transfers.
    #[must_use]
    pub fn files() -> Self {
        Self {
            connect: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read: Duration::from_secs(FILE_READ_TIMEOUT_SECS),
        }
    }
}

/// Transport construction failure.
#[derive(Debug, Error)]
#[error("failed to build {label} HTTP client: {source}")]
pub struct TransportError {
    /// Which component's transport failed.
    pub label: &'static str,
    /// Underlying builder error.
    #[source]
    pub source: reqwest::Error,
}

/// HTTP client created on first use and released explicitly.
#[derive(Debug)]
pub struct LazyTransport {
    label: &'static str,
    user_agent: String,
    timeouts: HttpTimeouts,
    client: Option<Client>,
}

impl LazyTransport {
    /// Creates an unopened transport; no network resources are allocated yet.
    #[must_use]
    pub fn new(label: &'static str, user_agent: impl Into<String>, timeouts: HttpTimeouts) -> Self {
        Self {
            label,
            user_agent: user_agent.into(),
            timeouts,
            client: None,
        }
    }

    /// Returns the client, building it on first call.
    ///
    /// reqwest clients are reference-counted, so the returned handle is cheap
    /// and shares the connection pool with the transport.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the client builder fails (TLS backend
    /// initialization, invalid User-Agent header value).
    pub fn client(&mut self) -> Result<Client, TransportError> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        let client = build_client(&self.user_agent, self.timeouts).map_err(|source| {
            TransportError {
                label: self.label,
                source,
            }
        })?;
        debug!(transport = self.label, "HTTP transport opened");
        self.client = Some(client.clone());
        Ok(client)
    }

    /// Whether a client is currently held.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    /// Drops the client and its connection pool. Idempotent.
    pub fn release(&mut self) {
        if self.client.take().is_some() {
            debug!(transport = self.label, "HTTP transport released");
        }
    }
}

fn build_client(user_agent: &str, timeouts: HttpTimeouts) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.read)
        .gzip(true)
        .user_agent(user_agent)
        .build()
}
