//! Error types for the search API client.

use thiserror::Error;

use crate::retry::{FailureType, classify_transport_error};
use crate::transport::TransportError;

/// Errors from a single API request (after retries, when returned to callers).
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection-level failure (DNS, refused connection, reset, TLS).
    #[error("network error requesting {url}: {source}")]
    Network {
        /// Request URL.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete within the transport timeout.
    #[error("timeout requesting {url}")]
    Timeout {
        /// Request URL.
        url: String,
    },

    /// The server rejected the credentials (HTTP 401).
    #[error("authentication rejected by {url} (HTTP 401)")]
    Unauthorized {
        /// Request URL.
        url: String,
    },

    /// Any other non-200 response.
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// Request URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// The body was not a valid search response.
    #[error("malformed response from {url}: {source}")]
    Decode {
        /// Request URL.
        url: String,
        /// JSON decoding error.
        #[source]
        source: serde_json::Error,
    },

    /// The configured base URL cannot be combined into a request URL.
    #[error("invalid API URL: {url}")]
    InvalidUrl {
        /// Offending URL string.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ApiError {
    /// Creates a network or timeout error from a reqwest error.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error, promoting 401 to [`ApiError::Unauthorized`].
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        let url = url.into();
        if status == 401 {
            Self::Unauthorized { url }
        } else {
            Self::HttpStatus { url, status }
        }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Retry classification.
    ///
    /// Every unexpected status is treated as transient: the search endpoint
    /// answers 5xx/429 under load and 4xx other than 401 are rare enough that a
    /// bounded retry costs little.
    #[must_use]
    pub fn failure_type(&self) -> FailureType {
        match self {
            Self::Network { source, .. } => classify_transport_error(source),
            Self::Timeout { .. } | Self::HttpStatus { .. } | Self::Decode { .. } => {
                FailureType::Transient
            }
            Self::Unauthorized { .. } => FailureType::NeedsAuth,
            Self::InvalidUrl { .. } | Self::Transport(_) => FailureType::Permanent,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_401_promoted_to_unauthorized() {
        let error = ApiError::http_status("https://example.net/posts.json", 401);
        assert!(matches!(error, ApiError::Unauthorized { .. }));
        assert_eq!(error.failure_type(), FailureType::NeedsAuth);
    }

    #[test]
    fn test_http_status_other_is_transient() {
        let error = ApiError::http_status("https://example.net/posts.json", 503);
        let msg = error.to_string();
        assert!(msg.contains("503"), "Expected status in: {msg}");
        assert_eq!(error.failure_type(), FailureType::Transient);
    }

    #[test]
    fn test_decode_error_display_and_classification() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let error = ApiError::decode("https://example.net/posts.json", source);
        assert!(error.to_string().contains("malformed response"));
        assert_eq!(error.failure_type(), FailureType::Transient);
    }

    #[test]
    fn test_invalid_url_is_permanent() {
        let error = ApiError::InvalidUrl {
            url: "nope".to_string(),
        };
        assert_eq!(error.failure_type(), FailureType::Permanent);
    }
}
