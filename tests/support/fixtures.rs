//! Shared builders for API payloads and run configuration.

use std::path::Path;
use std::time::Duration;

use serde_json::{Value, json};
use tag_downloader::config::{ApiConfig, Credentials, DownloadSettings, RunConfig};
use tag_downloader::retry::RetryPolicy;
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USERNAME: &str = "alice";
pub const API_KEY: &str = "s3cret";
pub const USER_AGENT: &str = "tag-downloader-tests/1.0";

/// One post as the search endpoint returns it.
pub fn post(id: u64, file_url: Option<&str>, artist: Option<&str>) -> Value {
    json!({
        "id": id,
        "file": { "url": file_url, "ext": "png" },
        "tags": { "artist": artist.map(|a| vec![a]).unwrap_or_default() },
    })
}

pub fn posts_body(posts: Vec<Value>) -> Value {
    json!({ "posts": posts })
}

/// `count` posts with ids starting at `first_id`, all pointing at `base`.
pub fn numbered_posts(base: &str, first_id: u64, count: u64) -> Vec<Value> {
    (first_id..first_id + count)
        .map(|id| post(id, Some(&format!("{base}/data/{id}.png")), Some("artist")))
        .collect()
}

pub fn credentials() -> Credentials {
    Credentials::new(USERNAME, API_KEY)
}

pub fn api_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        inter_request_delay: Duration::ZERO,
        user_agent: USER_AGENT.to_string(),
    }
}

pub fn run_config(base_url: &str, save_directory: &Path, item_cap: u32) -> RunConfig {
    RunConfig {
        credentials: credentials(),
        download: DownloadSettings {
            tags: "cat rating:s".to_string(),
            save_directory: save_directory.to_path_buf(),
            item_cap,
            max_items: 20_000,
        },
        api: api_config(base_url),
    }
}

/// Three attempts without waiting between them.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::ZERO)
}

/// Deterministic, non-repeating-looking file content.
pub fn file_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Accepts the credential check (the `limit=1` search).
pub async fn mount_login_ok(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/posts.json"))
        .and(query_param("limit", "1"))
        .and(basic_auth(USERNAME, API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(posts_body(vec![])))
        .mount(server)
        .await;
}

/// Serves one search page.
pub async fn mount_page(server: &MockServer, page: u32, posts: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/posts.json"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(posts_body(posts)))
        .mount(server)
        .await;
}

/// Serves a file body at `/data/<name>`.
pub async fn mount_file(server: &MockServer, name: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("/data/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}
