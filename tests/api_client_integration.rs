//! Integration tests for the search API client.
//!
//! These tests exercise login verification and pagination against mock HTTP servers.

use tag_downloader::api::{ApiClient, ApiError, FetchEnd};
use tag_downloader::config::SearchQuery;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::fixtures::{
    api_config, credentials, fast_retry, mount_login_ok, mount_page, numbered_posts, posts_body,
};
use support::socket_guard::start_mock_server_or_skip;

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(api_config(base_url), credentials()).with_retry_policy(fast_retry())
}

#[tokio::test]
async fn test_verify_login_accepts_valid_credentials() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_login_ok(&server).await;

    let mut client = client(&server.uri());
    assert!(client.verify_login().await.unwrap());
    assert!(client.is_open(), "transport opens on first request");

    client.close();
    assert!(!client.is_open());
}

#[tokio::test]
async fn test_verify_login_401_returns_false_without_retry() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/posts.json"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client(&server.uri());
    assert!(!client.verify_login().await.unwrap());
}

#[tokio::test]
async fn test_verify_login_unreachable_api_is_error_after_retries() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/posts.json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut client = client(&server.uri());
    let error = client.verify_login().await.unwrap_err();
    assert!(
        matches!(error, ApiError::HttpStatus { status: 503, .. }),
        "unexpected error: {error}"
    );
}

#[tokio::test]
async fn test_fetch_all_stops_on_short_page_without_requesting_next() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let base = server.uri();
    mount_page(&server, 1, numbered_posts(&base, 1, 2)).await;
    mount_page(&server, 2, numbered_posts(&base, 3, 1)).await;
    Mock::given(method("GET"))
        .and(path("/posts.json"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(posts_body(vec![])))
        .expect(0)
        .mount(&server)
        .await;

    let mut client = client(&base).with_page_size(2);
    let report = client.fetch_all(&SearchQuery::new("cat", 0)).await;

    assert_eq!(report.end, FetchEnd::EndOfResults);
    assert_eq!(report.pages_requested, 2);
    let ids: Vec<u64> = report.items.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_fetch_all_exact_multiple_ends_on_empty_page() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let base = server.uri();
    mount_page(&server, 1, numbered_posts(&base, 1, 2)).await;
    mount_page(&server, 2, vec![]).await;

    let mut client = client(&base).with_page_size(2);
    let report = client.fetch_all(&SearchQuery::new("cat", 0)).await;

    assert_eq!(report.end, FetchEnd::EndOfResults);
    assert_eq!(report.items.len(), 2);
}

#[tokio::test]
async fn test_fetch_all_enforces_item_cap() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let base = server.uri();
    mount_page(&server, 1, numbered_posts(&base, 1, 2)).await;
    mount_page(&server, 2, numbered_posts(&base, 3, 2)).await;
    Mock::given(method("GET"))
        .and(path("/posts.json"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(posts_body(vec![])))
        .expect(0)
        .mount(&server)
        .await;

    let mut client = client(&base).with_page_size(2);
    let report = client.fetch_all(&SearchQuery::new("cat", 3)).await;

    assert_eq!(report.end, FetchEnd::CapReached);
    assert_eq!(report.items.len(), 3);
    assert_eq!(report.items.last().map(|item| item.id), Some(3));
}

#[tokio::test]
async fn test_fetch_all_stops_at_hard_ceiling() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let base = server.uri();
    mount_page(&server, 1, numbered_posts(&base, 1, 2)).await;
    mount_page(&server, 2, numbered_posts(&base, 3, 2)).await;

    let mut client = client(&base).with_page_size(2);
    let query = SearchQuery::new("cat", 0).with_hard_ceiling(3);
    let report = client.fetch_all(&query).await;

    assert_eq!(report.end, FetchEnd::CeilingReached);
    assert_eq!(report.items.len(), 3);
}

#[tokio::test]
async fn test_fetch_all_retries_transient_page_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/posts.json"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, 1, numbered_posts(&base, 1, 1)).await;

    let mut client = client(&base).with_page_size(2);
    let report = client.fetch_all(&SearchQuery::new("cat", 0)).await;

    assert_eq!(report.end, FetchEnd::EndOfResults);
    assert_eq!(report.items.len(), 1);
}

#[tokio::test]
async fn test_fetch_all_reports_failed_page_and_keeps_earlier_items() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let base = server.uri();
    mount_page(&server, 1, numbered_posts(&base, 1, 2)).await;
    Mock::given(method("GET"))
        .and(path("/posts.json"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let mut client = client(&base).with_page_size(2);
    let report = client.fetch_all(&SearchQuery::new("cat", 0)).await;

    assert!(report.end.is_failure());
    assert!(matches!(report.end, FetchEnd::PageFailed { page: 2, .. }));
    assert_eq!(report.items.len(), 2);
}

#[tokio::test]
async fn test_fetch_all_treats_malformed_body_as_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/posts.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(3)
        .mount(&server)
        .await;

    let mut client = client(&server.uri());
    let report = client.fetch_all(&SearchQuery::new("cat", 0)).await;

    assert!(matches!(report.end, FetchEnd::PageFailed { page: 1, .. }));
    assert!(report.items.is_empty());
}

#[tokio::test]
async fn test_fetch_page_sends_tags_and_tolerates_missing_fields() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/posts.json"))
        .and(query_param("tags", "character:x rating:s"))
        .and(query_param("limit", "320"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "posts": [
                { "id": 10, "file": { "url": null }, "tags": {} },
                { "id": 11 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client(&server.uri());
    let items = client
        .fetch_page("character:x rating:s", 320, 1)
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item.file_url().is_none()));
    assert!(items[0].primary_artist().is_none());
}
