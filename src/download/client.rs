//! Resumable file downloader.
//!
//! Files are staged as `<name>.part` next to their final path and renamed once
//! the full body has been received. A later run picks up an existing partial
//! file with a ranged request.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::DownloadError;
use super::filename::{partial_path_for, sanitize_filename};
use super::task::DownloadTask;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::transport::{HttpTimeouts, LazyTransport};

/// Buffer size for writing response bodies to disk (8 KiB).
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Downloads task files into one directory.
///
/// # Example
///
/// ```no_run
/// use tag_downloader::download::{DownloadTask, FileDownloader};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut downloader = FileDownloader::new("./downloads", "my-agent/1.0");
/// let task = DownloadTask {
///     url: "https://static.example.net/data/ab/abcd.png".to_string(),
///     filename: "alice_42.png".to_string(),
///     item_id: 42,
///     attribution: "alice".to_string(),
/// };
/// let ok = downloader.download(&task).await?;
/// downloader.close();
/// println!("downloaded: {ok}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileDownloader {
    save_directory: PathBuf,
    transport: LazyTransport,
    retry_policy: RetryPolicy,
}

/// How the body of one response is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Append,
    Truncate,
}

impl FileDownloader {
    /// Creates a downloader; no connection is made until the first transfer.
    #[must_use]
    pub fn new(save_directory: impl Into<PathBuf>, user_agent: impl Into<String>) -> Self {
        Self {
            save_directory: save_directory.into(),
            transport: LazyTransport::new("files", user_agent, HttpTimeouts::files()),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Destination directory.
    #[must_use]
    pub fn save_directory(&self) -> &Path {
        &self.save_directory
    }

    /// Final on-disk path for a task (sanitized name inside the save directory).
    #[must_use]
    pub fn final_path_for(&self, task: &DownloadTask) -> PathBuf {
        self.save_directory.join(sanitize_filename(&task.filename))
    }

    /// Whether the transport is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Releases the transport. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.transport.release();
    }

    /// Downloads one task.
    ///
    /// Returns `Ok(true)` when the file is on disk (including when it was
    /// already present), `Ok(false)` when the task failed after retries or on
    /// a permanent status.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] for filesystem failures and
    /// [`DownloadError::Transport`] when the HTTP client cannot be built.
    /// Both are unrecoverable for the run.
    #[instrument(skip(self, task), fields(item_id = task.item_id, url = %task.url))]
    pub async fn download(&mut self, task: &DownloadTask) -> Result<bool, DownloadError> {
        tokio::fs::create_dir_all(&self.save_directory)
            .await
            .map_err(|e| DownloadError::io(self.save_directory.clone(), e))?;

        let final_path = self.final_path_for(task);
        let partial_path = partial_path_for(&final_path);

        if tokio::fs::try_exists(&final_path)
            .await
            .map_err(|e| DownloadError::io(final_path.clone(), e))?
        {
            info!(path = %final_path.display(), "already present, skipping");
            return Ok(true);
        }

        let Ok(url) = Url::parse(&task.url) else {
            let error = DownloadError::InvalidUrl {
                url: task.url.clone(),
            };
            warn!(error = %error, "download failed");
            return Ok(false);
        };

        let client = self.transport.client()?;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match transfer(&client, &url, &partial_path).await {
                Ok(bytes) => {
                    tokio::fs::rename(&partial_path, &final_path)
                        .await
                        .map_err(|e| DownloadError::io(final_path.clone(), e))?;
                    info!(path = %final_path.display(), bytes, attempt, "download complete");
                    return Ok(true);
                }
                Err(error) if error.is_unrecoverable() => return Err(error),
                Err(error) => match self.retry_policy.should_retry(error.failure_type(), attempt) {
                    RetryDecision::Retry {
                        delay,
                        attempt: next_attempt,
                    } => {
                        warn!(
                            attempt = next_attempt,
                            max_attempts = self.retry_policy.max_attempts(),
                            delay_ms = delay.as_millis(),
                            error = %error,
                            "retrying download"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::DoNotRetry { reason } => {
                        warn!(attempt, error = %error, %reason, "download failed");
                        return Ok(false);
                    }
                },
            }
        }
    }
}

/// Makes one transfer attempt into `partial_path`, returning its final size.
async fn transfer(client: &Client, url: &Url, partial_path: &Path) -> Result<u64, DownloadError> {
    let offset = partial_len(partial_path).await?;

    let mut request = client.get(url.clone());
    if offset > 0 {
        debug!(offset, "resuming partial file");
        request = request.header(RANGE, format!("bytes={offset}-"));
    }
    let response = request
        .send()
        .await
        .map_err(|e| DownloadError::network(url.as_str(), e))?;

    let status = response.status();
    let mode = match status {
        StatusCode::PARTIAL_CONTENT if offset > 0 => WriteMode::Append,
        StatusCode::PARTIAL_CONTENT => WriteMode::Truncate,
        StatusCode::OK => {
            if offset > 0 {
                debug!(offset, "server ignored range request; restarting from zero");
            }
            WriteMode::Truncate
        }
        StatusCode::RANGE_NOT_SATISFIABLE if offset > 0 => {
            tokio::fs::remove_file(partial_path)
                .await
                .map_err(|e| DownloadError::io(partial_path, e))?;
            return Err(DownloadError::RangeNotSatisfiable {
                url: url.to_string(),
                offset,
            });
        }
        other => return Err(DownloadError::http_status(url.as_str(), other.as_u16())),
    };

    let base = if mode == WriteMode::Append { offset } else { 0 };
    let expected_total = response.content_length().map(|len| base.saturating_add(len));

    let mut file = open_partial(partial_path, mode).await?;
    let written = stream_to_file(&mut file, response, url.as_str(), partial_path).await?;
    let actual_total = base.saturating_add(written);

    if let Some(expected) = expected_total {
        if actual_total < expected {
            return Err(DownloadError::incomplete(partial_path, expected, actual_total));
        }
        if actual_total > expected {
            // Appended bytes no longer line up with the server's copy.
            tokio::fs::remove_file(partial_path)
                .await
                .map_err(|e| DownloadError::io(partial_path, e))?;
            return Err(DownloadError::incomplete(partial_path, expected, actual_total));
        }
    }

    Ok(actual_total)
}

async fn partial_len(partial_path: &Path) -> Result<u64, DownloadError> {
    match tokio::fs::metadata(partial_path).await {
        Ok(metadata) => Ok(metadata.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(DownloadError::io(partial_path, e)),
    }
}

async fn open_partial(partial_path: &Path, mode: WriteMode) -> Result<File, DownloadError> {
    let result = match mode {
        WriteMode::Append => {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(partial_path)
                .await
        }
        WriteMode::Truncate => File::create(partial_path).await,
    };
    result.map_err(|e| DownloadError::io(partial_path, e))
}

/// Streams the response body through a fixed-size buffered writer, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = match chunk_result {
            Ok(chunk) => chunk,
            Err(e) => {
                // Keep what arrived so the next attempt can resume from it.
                writer
                    .flush()
                    .await
                    .map_err(|io| DownloadError::io(file_path, io))?;
                return Err(DownloadError::network(url, e));
            }
        };

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}
