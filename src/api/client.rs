//! Paginated search client with login verification.

use std::fmt;

use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::ApiError;
use super::models::{Item, PostsResponse};
use crate::config::{ApiConfig, Credentials, SearchQuery};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::transport::{HttpTimeouts, LazyTransport};

/// Largest page the search endpoint serves.
pub const MAX_PAGE_SIZE: usize = 320;

/// Search endpoint path relative to the base URL.
pub const POSTS_ENDPOINT: &str = "posts.json";

/// Why [`ApiClient::fetch_all`] stopped requesting pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEnd {
    /// A page came back shorter than the page size.
    EndOfResults,
    /// The configured item cap was reached.
    CapReached,
    /// The hard safety ceiling was reached before results ran out.
    CeilingReached,
    /// A page failed after all retries; results after it are unknown.
    PageFailed {
        /// 1-indexed page that failed.
        page: u32,
        /// Error description.
        reason: String,
    },
}

impl FetchEnd {
    /// Whether pagination stopped because of an error rather than a limit.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::PageFailed { .. })
    }
}

impl fmt::Display for FetchEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfResults => f.write_str("end of results"),
            Self::CapReached => f.write_str("item cap reached"),
            Self::CeilingReached => f.write_str("safety ceiling reached"),
            Self::PageFailed { page, reason } => write!(f, "page {page} failed: {reason}"),
        }
    }
}

/// Result of a full paginated search.
#[derive(Debug, Clone)]
pub struct FetchReport {
    /// Matched items in server order, truncated to the effective limit.
    pub items: Vec<Item>,
    /// Why pagination stopped.
    pub end: FetchEnd,
    /// Number of page requests issued.
    pub pages_requested: u32,
}

/// Client for the search API.
///
/// Holds its transport exclusively; call [`close`](Self::close) when done.
#[derive(Debug)]
pub struct ApiClient {
    config: ApiConfig,
    credentials: Credentials,
    transport: LazyTransport,
    retry_policy: RetryPolicy,
    page_size: usize,
}

impl ApiClient {
    /// Creates a client; no connection is made until the first request.
    #[must_use]
    pub fn new(config: ApiConfig, credentials: Credentials) -> Self {
        let transport = LazyTransport::new("api", config.user_agent.clone(), HttpTimeouts::api());
        Self {
            config,
            credentials,
            transport,
            retry_policy: RetryPolicy::default(),
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Overrides the page size used by [`fetch_all`](Self::fetch_all).
    ///
    /// Clamped to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Page size used by [`fetch_all`](Self::fetch_all).
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
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

    /// Checks the credentials with a minimal authenticated search.
    ///
    /// Returns `Ok(false)` when the server answers 401; that answer is never
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the API could not be reached after retries,
    /// so an unreachable server is not mistaken for bad credentials.
    #[instrument(skip(self), fields(username = %self.credentials.username))]
    pub async fn verify_login(&mut self) -> Result<bool, ApiError> {
        match self.request_posts(&[("limit", "1".to_string())]).await {
            Ok(_) => {
                debug!("credentials accepted");
                Ok(true)
            }
            Err(ApiError::Unauthorized { .. }) => {
                warn!("credentials rejected");
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    /// Fetches one page of results (1-indexed).
    ///
    /// An empty vector means the server reported no matches on this page.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the page could not be fetched after retries.
    #[instrument(skip(self))]
    pub async fn fetch_page(
        &mut self,
        tags: &str,
        page_size: usize,
        page: u32,
    ) -> Result<Vec<Item>, ApiError> {
        let params = [
            ("tags", tags.to_string()),
            ("limit", page_size.to_string()),
            ("page", page.to_string()),
        ];
        let response = self.request_posts(&params).await?;
        debug!(received = response.posts.len(), "page fetched");
        Ok(response.posts)
    }

    /// Fetches pages until results run out, the cap or ceiling is reached, or a page fails.
    ///
    /// Sleeps the configured inter-request delay between page requests.
    #[instrument(skip(self, query), fields(tags = %query.tags, cap = query.item_cap))]
    pub async fn fetch_all(&mut self, query: &SearchQuery) -> FetchReport {
        let limit = query.effective_limit();
        let cap_binds = query.item_cap != 0 && query.item_cap <= query.hard_ceiling;
        let page_size = self.page_size;
        let mut items: Vec<Item> = Vec::new();
        let mut page: u32 = 1;

        let end = loop {
            if page > 1 {
                tokio::time::sleep(self.config.inter_request_delay).await;
            }

            match self.fetch_page(&query.tags, page_size, page).await {
                Ok(batch) => {
                    let received = batch.len();
                    items.extend(batch);
                    info!(page, received, accumulated = items.len(), "fetched page");

                    if items.len() >= limit {
                        items.truncate(limit);
                        break if cap_binds {
                            FetchEnd::CapReached
                        } else {
                            FetchEnd::CeilingReached
                        };
                    }
                    if received < page_size {
                        break FetchEnd::EndOfResults;
                    }
                    page += 1;
                }
                Err(error) => {
                    warn!(page, error = %error, "page fetch failed; stopping pagination");
                    break FetchEnd::PageFailed {
                        page,
                        reason: error.to_string(),
                    };
                }
            }
        };

        if end == FetchEnd::CeilingReached {
            warn!(
                ceiling = query.hard_ceiling,
                "safety ceiling reached; remaining results were not fetched"
            );
        }

        FetchReport {
            items,
            end,
            pages_requested: page,
        }
    }

    fn posts_url(&self, params: &[(&str, String)]) -> Result<Url, ApiError> {
        let raw = format!("{}/{POSTS_ENDPOINT}", self.config.trimmed_base_url());
        Url::parse_with_params(&raw, params).map_err(|_| ApiError::InvalidUrl { url: raw })
    }

    /// Issues one search request with the retry policy applied.
    async fn request_posts(
        &mut self,
        params: &[(&str, String)],
    ) -> Result<PostsResponse, ApiError> {
        let url = self.posts_url(params)?;
        let client = self.transport.client()?;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.request_posts_once(&client, &url).await {
                Ok(response) => return Ok(response),
                Err(error) => match self.retry_policy.should_retry(error.failure_type(), attempt) {
                    RetryDecision::Retry {
                        delay,
                        attempt: next_attempt,
                    } => {
                        warn!(
                            url = %url,
                            attempt = next_attempt,
                            max_attempts = self.retry_policy.max_attempts(),
                            delay_ms = delay.as_millis(),
                            error = %error,
                            "retrying API request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::DoNotRetry { reason } => {
                        debug!(url = %url, %reason, "not retrying API request");
                        return Err(error);
                    }
                },
            }
        }
    }

    async fn request_posts_once(
        &self,
        client: &Client,
        url: &Url,
    ) -> Result<PostsResponse, ApiError> {
        let response = client
            .get(url.clone())
            .basic_auth(&self.credentials.username, Some(&self.credentials.api_key))
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(url.as_str(), e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ApiError::http_status(url.as_str(), status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(url.as_str(), e))?;
        serde_json::from_slice(&body).map_err(|e| ApiError::decode(url.as_str(), e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn test_client(base_url: &str) -> ApiClient {
        ApiClient::new(
            ApiConfig {
                base_url: base_url.to_string(),
                inter_request_delay: Duration::ZERO,
                user_agent: "test-agent/1.0".to_string(),
            },
            Credentials::new("alice", "key"),
        )
    }

    #[test]
    fn test_posts_url_encodes_tags_and_trims_slash() {
        let client = test_client("https://example.net/");
        let url = client
            .posts_url(&[("tags", "character:x rating:s".to_string()), ("page", "2".to_string())])
            .unwrap();
        assert_eq!(url.path(), "/posts.json");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("tags".to_string(), "character:x rating:s".to_string()),
                ("page".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn test_posts_url_rejects_garbage_base() {
        let client = test_client("not a url");
        assert!(matches!(
            client.posts_url(&[]),
            Err(ApiError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_page_size_clamped() {
        assert_eq!(test_client("https://x.net").with_page_size(0).page_size(), 1);
        assert_eq!(
            test_client("https://x.net").with_page_size(10_000).page_size(),
            MAX_PAGE_SIZE
        );
    }

    #[test]
    fn test_client_starts_closed() {
        let mut client = test_client("https://x.net");
        assert!(!client.is_open());
        client.close();
        assert!(!client.is_open());
    }

    #[test]
    fn test_verify_login_invalid_base_url_fails_without_network() {
        let mut client = test_client("not a url").with_retry_policy(RetryPolicy::no_retry());
        let result = tokio_test::block_on(client.verify_login());
        assert!(matches!(result, Err(ApiError::InvalidUrl { .. })));
        assert!(!client.is_open(), "transport must not open for a bad URL");
    }

    #[test]
    fn test_fetch_end_display() {
        assert_eq!(FetchEnd::EndOfResults.to_string(), "end of results");
        let failed = FetchEnd::PageFailed {
            page: 3,
            reason: "timeout".to_string(),
        };
        assert!(failed.is_failure());
        assert_eq!(failed.to_string(), "page 3 failed: timeout");
    }
}
