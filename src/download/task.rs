//! Download tasks derived from search results.

use thiserror::Error;
use url::Url;

use super::filename::extension_from_url;
use crate::api::Item;

/// Attribution used when an item carries no artist tag.
pub const UNKNOWN_ATTRIBUTION: &str = "unknown";

/// Extension used when neither the URL nor the server names one.
pub const FALLBACK_EXTENSION: &str = "bin";

/// One file to fetch. Built once per item and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Absolute http(s) URL of the file.
    pub url: String,
    /// Unsanitized file name, `<attribution>_<item_id>.<ext>`.
    pub filename: String,
    /// Server id of the source item.
    pub item_id: u64,
    /// First artist tag, or [`UNKNOWN_ATTRIBUTION`].
    pub attribution: String,
}

/// Why an item produced no task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// The item has no file URL (deleted or restricted content).
    #[error("no file URL")]
    MissingUrl,
    /// The URL is not an absolute http or https URL.
    #[error("unsupported file URL {0:?}")]
    UnsupportedUrl(String),
}

impl DownloadTask {
    /// Derives a task from a search result.
    ///
    /// # Errors
    ///
    /// Returns [`SkipReason`] when the item has no downloadable URL.
    pub fn from_item(item: &Item) -> Result<Self, SkipReason> {
        let raw_url = item.file_url().ok_or(SkipReason::MissingUrl)?;
        let parsed =
            Url::parse(raw_url).map_err(|_| SkipReason::UnsupportedUrl(raw_url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(SkipReason::UnsupportedUrl(raw_url.to_string()));
        }

        let attribution = item
            .primary_artist()
            .unwrap_or(UNKNOWN_ATTRIBUTION)
            .to_string();
        let extension = extension_from_url(raw_url)
            .or_else(|| {
                item.server_extension()
                    .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                    .filter(|ext| !ext.is_empty())
            })
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

        Ok(Self {
            url: raw_url.to_string(),
            filename: format!("{attribution}_{}.{extension}", item.id),
            item_id: item.id,
            attribution,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_task_from_item_uses_first_artist_and_url_extension() {
        let item = Item::new(
            42,
            Some("https://static.example.net/data/ab/cd/abcd.PNG"),
            &["alice", "bob"],
        );
        let task = DownloadTask::from_item(&item).unwrap();
        assert_eq!(task.filename, "alice_42.png");
        assert_eq!(task.attribution, "alice");
        assert_eq!(task.item_id, 42);
        assert_eq!(task.url, "https://static.example.net/data/ab/cd/abcd.PNG");
    }

    #[test]
    fn test_task_from_item_without_artist_is_unknown() {
        let item = Item::new(7, Some("https://static.example.net/x.webm"), &[]);
        let task = DownloadTask::from_item(&item).unwrap();
        assert_eq!(task.filename, "unknown_7.webm");
    }

    #[test]
    fn test_task_from_item_without_url_is_skipped() {
        let item = Item::new(9, None, &["alice"]);
        assert_eq!(DownloadTask::from_item(&item), Err(SkipReason::MissingUrl));
    }

    #[test]
    fn test_task_from_item_relative_url_is_skipped() {
        let item = Item::new(9, Some("/data/x.png"), &[]);
        assert!(matches!(
            DownloadTask::from_item(&item),
            Err(SkipReason::UnsupportedUrl(_))
        ));
    }

    #[test]
    fn test_task_from_item_non_http_scheme_is_skipped() {
        let item = Item::new(9, Some("ftp://files.example.net/x.png"), &[]);
        assert!(matches!(
            DownloadTask::from_item(&item),
            Err(SkipReason::UnsupportedUrl(_))
        ));
    }

    #[test]
    fn test_task_from_item_falls_back_to_bin_extension() {
        let item = Item::new(3, Some("https://static.example.net/download"), &["carol"]);
        let task = DownloadTask::from_item(&item).unwrap();
        assert_eq!(task.filename, "carol_3.bin");
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::MissingUrl.to_string(), "no file URL");
    }
}
