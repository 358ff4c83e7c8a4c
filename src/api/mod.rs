//! Client for a booru-style search API (`GET {base}/posts.json`).
//!
//! Requests carry HTTP Basic authentication built from the run's
//! [`Credentials`](crate::config::Credentials). Transient failures are retried
//! under a fixed-delay [`RetryPolicy`](crate::retry::RetryPolicy); a page that
//! still fails is reported as [`FetchEnd::PageFailed`] instead of being
//! mistaken for the end of the results.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tag_downloader::api::ApiClient;
//! use tag_downloader::config::{ApiConfig, Credentials, SearchQuery};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = ApiClient::new(
//!     ApiConfig {
//!         base_url: "https://e621.net".to_string(),
//!         inter_request_delay: Duration::from_secs(1),
//!         user_agent: "my-tool/1.0 (by alice)".to_string(),
//!     },
//!     Credentials::new("alice", "api-key"),
//! );
//! if client.verify_login().await? {
//!     let report = client.fetch_all(&SearchQuery::new("character:x", 100)).await;
//!     println!("{} items ({})", report.items.len(), report.end);
//! }
//! client.close();
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod models;

pub use client::{ApiClient, FetchEnd, FetchReport, MAX_PAGE_SIZE, POSTS_ENDPOINT};
pub use error::ApiError;
pub use models::{FileInfo, Item, TagGroups};
