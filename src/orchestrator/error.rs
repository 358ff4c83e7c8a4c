//! Errors that stop a run outright.

use thiserror::Error;

use crate::download::DownloadError;
use crate::transport::TransportError;

/// Errors that abort a run after it has started.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Filesystem failure while writing downloads.
    #[error("download aborted: {0}")]
    Download(#[source] DownloadError),

    /// An HTTP client could not be constructed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<DownloadError> for OrchestratorError {
    fn from(error: DownloadError) -> Self {
        match error {
            DownloadError::Transport(transport) => Self::Transport(transport),
            other => Self::Download(other),
        }
    }
}
