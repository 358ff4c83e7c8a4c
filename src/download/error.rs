//! Error types for the download module.
//!
//! Most variants describe one failed transfer attempt and are retried or
//! absorbed into the task's outcome. [`DownloadError::Io`] and
//! [`DownloadError::Transport`] are unrecoverable and abort the run.

use std::path::PathBuf;

use thiserror::Error;

use crate::retry::{FailureType, classify_http_status, classify_transport_error};
use crate::transport::TransportError;

/// Errors that can occur during file downloads.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, reset mid-body, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Response status other than 200/206.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The server refused the resume offset (HTTP 416); the stale partial file was discarded.
    #[error("range not satisfiable for {url} at offset {offset}; partial file discarded")]
    RangeNotSatisfiable {
        /// The URL being resumed.
        url: String,
        /// Offset that was requested.
        offset: u64,
    },

    /// The body ended before the length the server announced.
    #[error("incomplete transfer to {path}: expected {expected_bytes} bytes, got {actual_bytes}")]
    Incomplete {
        /// Partial file path.
        path: PathBuf,
        /// Expected total size in bytes.
        expected_bytes: u64,
        /// Size on disk after the attempt.
        actual_bytes: u64,
    },

    /// The task URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// File system error (create directory, write, rename).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be constructed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl DownloadError {
    /// Creates a network or timeout error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an incomplete-transfer error.
    pub fn incomplete(path: impl Into<PathBuf>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::Incomplete {
            path: path.into(),
            expected_bytes,
            actual_bytes,
        }
    }

    /// Whether this error must abort the whole run instead of failing one task.
    #[must_use]
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Transport(_))
    }

    /// Retry classification for recoverable errors.
    #[must_use]
    pub fn failure_type(&self) -> FailureType {
        match self {
            Self::Network { source, .. } => classify_transport_error(source),
            Self::Timeout { .. } | Self::RangeNotSatisfiable { .. } | Self::Incomplete { .. } => {
                FailureType::Transient
            }
            Self::HttpStatus { status, .. } => classify_http_status(*status),
            Self::InvalidUrl { .. } | Self::Io { .. } | Self::Transport(_) => {
                FailureType::Permanent
            }
        }
    }
}
