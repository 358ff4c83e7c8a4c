//! Tag Downloader Library
//!
//! Fetches every item matching a tag query from a paginated search API and
//! downloads the associated files into a local directory, resuming partial
//! transfers and skipping files already on disk.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`api`] - Search API client with login verification and pagination
//! - [`config`] - Run configuration, file loading and validation
//! - [`download`] - Resumable file downloads and filename sanitization
//! - [`orchestrator`] - Run lifecycle, events and cancellation
//! - [`progress`] - Completion counters, throughput and ETA
//! - [`retry`] - Retry policy and failure classification
//! - [`transport`] - Lazily built HTTP clients

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod config;
pub mod download;
pub mod orchestrator;
pub mod progress;
pub mod retry;
pub mod transport;
mod user_agent;

// Re-export commonly used types
pub use api::{ApiClient, ApiError, FetchEnd, FetchReport, Item};
pub use config::{
    ApiConfig, ConfigError, Credentials, DownloadSettings, PartialConfig, RunConfig, SearchQuery,
};
pub use download::{DownloadError, DownloadTask, FileDownloader, sanitize_filename};
pub use orchestrator::{
    CancellationToken, Orchestrator, OrchestratorError, RunEvent, RunOutcome, RunState, RunSummary,
};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use retry::{FailureType, RetryDecision, RetryPolicy};
