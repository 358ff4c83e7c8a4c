//! Default User-Agent for API and file requests.
//!
//! Booru-style APIs reject anonymous agents and ask clients to identify both
//! the project and the account (`project/version (by username)`).

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/tag-downloader";

/// Default User-Agent naming the tool, its version and the account it runs as.
#[must_use]
pub(crate) fn default_user_agent(username: &str) -> String {
    let version = env!("CARGO_PKG_VERSION");
    let username = username.trim();
    if username.is_empty() {
        format!("tag-downloader/{version} (+{PROJECT_UA_URL})")
    } else {
        format!("tag-downloader/{version} (by {username}; +{PROJECT_UA_URL})")
    }
}
