//! Run configuration: passive value structures handed to the core.
//!
//! A [`RunConfig`] is built once per run by whatever front-end owns user
//! preferences and is read-only afterwards. Front-ends usually start from a
//! [`PartialConfig`] (every field optional, e.g. deserialized from a JSON file),
//! layer their own overrides on top and call [`PartialConfig::resolve`], which
//! fills defaults and validates everything before any network activity.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::user_agent;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://e621.net";

/// Default pause between consecutive API/file requests (seconds).
pub const DEFAULT_INTER_REQUEST_DELAY_SECS: f64 = 1.0;

/// Default safety ceiling on items fetched per run, applied even when no cap is set.
pub const DEFAULT_MAX_ITEMS: u32 = 20_000;

/// Errors raised while building or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field was not supplied by any configuration source.
    #[error("missing field `{field}` in section `{section}`")]
    MissingField {
        /// Configuration section (`credentials`, `download`, `api`).
        section: &'static str,
        /// Field name within the section.
        field: &'static str,
    },

    /// A field was supplied but its value is unusable.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for this schema.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    fn missing(section: &'static str, field: &'static str) -> Self {
        Self::MissingField { section, field }
    }

    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Static credential pair sent as HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// API key (the Basic-auth password).
    pub api_key: String,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// API endpoint settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// API root, e.g. `https://e621.net` (trailing slash tolerated).
    pub base_url: String,
    /// Pause between page fetches and between file downloads.
    pub inter_request_delay: Duration,
    /// User-Agent sent with every request.
    pub user_agent: String,
}

impl ApiConfig {
    /// Base URL without trailing slashes.
    #[must_use]
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// What to download and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Space-separated tag query passed verbatim to the search endpoint.
    pub tags: String,
    /// Destination directory for final files and `.part` staging files.
    pub save_directory: PathBuf,
    /// Maximum items to process; 0 means unbounded (still subject to `max_items`).
    pub item_cap: u32,
    /// Hard safety ceiling on items fetched per run.
    pub max_items: u32,
}

/// Search parameters derived from [`DownloadSettings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Tag query.
    pub tags: String,
    /// Item cap; 0 means unbounded.
    pub item_cap: u32,
    /// Hard ceiling, always applied.
    pub hard_ceiling: u32,
}

impl SearchQuery {
    /// Creates a query with the default hard ceiling.
    #[must_use]
    pub fn new(tags: impl Into<String>, item_cap: u32) -> Self {
        Self {
            tags: tags.into(),
            item_cap,
            hard_ceiling: DEFAULT_MAX_ITEMS,
        }
    }

    /// Replaces the hard ceiling (clamped to at least 1).
    #[must_use]
    pub fn with_hard_ceiling(mut self, hard_ceiling: u32) -> Self {
        self.hard_ceiling = hard_ceiling.max(1);
        self
    }

    /// Effective maximum number of items this query may return.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        let ceiling = self.hard_ceiling.max(1) as usize;
        if self.item_cap == 0 {
            ceiling
        } else {
            (self.item_cap as usize).min(ceiling)
        }
    }
}

impl From<&DownloadSettings> for SearchQuery {
    fn from(settings: &DownloadSettings) -> Self {
        Self::new(settings.tags.trim(), settings.item_cap).with_hard_ceiling(settings.max_items)
    }
}

/// Complete, validated configuration for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Account credentials.
    pub credentials: Credentials,
    /// Tag query and destination.
    pub download: DownloadSettings,
    /// Endpoint settings.
    pub api: ApiConfig,
}

impl RunConfig {
    /// Search query for this run.
    #[must_use]
    pub fn search_query(&self) -> SearchQuery {
        SearchQuery::from(&self.download)
    }

    /// Checks every field; called before any network activity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.username.trim().is_empty() {
            return Err(ConfigError::missing("credentials", "username"));
        }
        if self.credentials.api_key.trim().is_empty() {
            return Err(ConfigError::missing("credentials", "api_key"));
        }
        if self.download.tags.trim().is_empty() {
            return Err(ConfigError::missing("download", "tags"));
        }
        if self.download.save_directory.as_os_str().is_empty() {
            return Err(ConfigError::missing("download", "save_directory"));
        }
        if self.download.max_items == 0 {
            return Err(ConfigError::invalid("max_items", "must be at least 1"));
        }
        validate_base_url(&self.api.base_url)?;
        if self.api.user_agent.trim().is_empty() {
            return Err(ConfigError::missing("api", "user_agent"));
        }
        Ok(())
    }
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(base_url)
        .map_err(|e| ConfigError::invalid("base_url", format!("{base_url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            "base_url",
            format!("unsupported scheme `{}`", parsed.scheme()),
        ));
    }
    Ok(())
}

/// Credential section with every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialCredentials {
    /// Account name.
    pub username: Option<String>,
    /// API key.
    #[serde(alias = "secret")]
    pub api_key: Option<String>,
}

/// Download section with every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialDownload {
    /// Tag query.
    pub tags: Option<String>,
    /// Destination directory.
    pub save_directory: Option<PathBuf>,
    /// Item cap (0 = unbounded).
    #[serde(alias = "item_cap")]
    pub limit: Option<u32>,
    /// Hard ceiling.
    pub max_items: Option<u32>,
}

/// API section with every field optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialApi {
    /// API root.
    pub base_url: Option<String>,
    /// Inter-request delay in seconds.
    #[serde(alias = "inter_request_delay_seconds")]
    pub delay: Option<f64>,
    /// User-Agent override.
    pub user_agent: Option<String>,
}

/// Layered configuration input; later layers override earlier ones via [`PartialConfig::merge`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialConfig {
    /// Credential section.
    pub credentials: PartialCredentials,
    /// Download section.
    pub download: PartialDownload,
    /// API section.
    pub api: PartialApi,
}

impl PartialConfig {
    /// Loads a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses a JSON config document.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] for malformed input.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Overlays `other` on top of `self`; fields set in `other` win.
    #[must_use]
    pub fn merge(self, other: PartialConfig) -> Self {
        Self {
            credentials: PartialCredentials {
                username: other.credentials.username.or(self.credentials.username),
                api_key: other.credentials.api_key.or(self.credentials.api_key),
            },
            download: PartialDownload {
                tags: other.download.tags.or(self.download.tags),
                save_directory: other
                    .download
                    .save_directory
                    .or(self.download.save_directory),
                limit: other.download.limit.or(self.download.limit),
                max_items: other.download.max_items.or(self.download.max_items),
            },
            api: PartialApi {
                base_url: other.api.base_url.or(self.api.base_url),
                delay: other.api.delay.or(self.api.delay),
                user_agent: other.api.user_agent.or(self.api.user_agent),
            },
        }
    }

    /// Fills defaults, checks required fields and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] for absent required fields and
    /// [`ConfigError::InvalidValue`] for unusable values.
    pub fn resolve(self) -> Result<RunConfig, ConfigError> {
        let username = self
            .credentials
            .username
            .ok_or_else(|| ConfigError::missing("credentials", "username"))?;
        let api_key = self
            .credentials
            .api_key
            .ok_or_else(|| ConfigError::missing("credentials", "api_key"))?;
        let tags = self
            .download
            .tags
            .ok_or_else(|| ConfigError::missing("download", "tags"))?;
        let save_directory = self
            .download
            .save_directory
            .ok_or_else(|| ConfigError::missing("download", "save_directory"))?;

        let delay_secs = self.api.delay.unwrap_or(DEFAULT_INTER_REQUEST_DELAY_SECS);
        let inter_request_delay = Duration::try_from_secs_f64(delay_secs)
            .map_err(|e| ConfigError::invalid("delay", format!("{delay_secs}: {e}")))?;

        let user_agent = self
            .api
            .user_agent
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or_else(|| user_agent::default_user_agent(&username));

        let config = RunConfig {
            credentials: Credentials { username, api_key },
            download: DownloadSettings {
                tags,
                save_directory,
                item_cap: self.download.limit.unwrap_or(0),
                max_items: self.download.max_items.unwrap_or(DEFAULT_MAX_ITEMS),
            },
            api: ApiConfig {
                base_url: self
                    .api
                    .base_url
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                inter_request_delay,
                user_agent,
            },
        };
        config.validate()?;
        Ok(config)
    }
}
