//! Resumable file downloads.
//!
//! Turns search results into [`DownloadTask`]s and fetches them with
//! [`FileDownloader`], staging each file under a `.part` name until the full
//! body has arrived.
//!
//! # Features
//!
//! - Streaming downloads through a fixed 8 KiB buffered writer
//! - Resume from an existing partial file with `Range: bytes=<offset>-`
//! - Idempotent: a file already present is never requested again
//! - Filesystem-safe names, capped at 100 characters
//!
//! # Example
//!
//! ```no_run
//! use tag_downloader::api::Item;
//! use tag_downloader::download::{DownloadTask, FileDownloader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let item = Item::new(42, Some("https://static.example.net/ab/abcd.png"), &["alice"]);
//! let task = DownloadTask::from_item(&item)?;
//! let mut downloader = FileDownloader::new("./downloads", "my-agent/1.0");
//! downloader.download(&task).await?;
//! downloader.close();
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod filename;
mod task;

pub use client::{CHUNK_SIZE, FileDownloader};
pub use error::DownloadError;
pub use filename::{
    MAX_FILENAME_BYTES, MAX_FILENAME_CHARS, PARTIAL_SUFFIX, extension_from_url, partial_path_for,
    sanitize_filename,
};
pub use task::{DownloadTask, FALLBACK_EXTENSION, SkipReason, UNKNOWN_ATTRIBUTION};
