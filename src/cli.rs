//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;
use tag_downloader::config::{PartialApi, PartialConfig, PartialCredentials, PartialDownload};

/// Download every file matching a tag query.
///
/// Pages through the search API with your account credentials and saves each
/// matching file as `<artist>_<id>.<ext>`, resuming interrupted transfers and
/// skipping files already present.
#[derive(Parser, Debug)]
#[command(name = "tag-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Account name used for Basic authentication
    #[arg(short, long, env = "TAG_DOWNLOADER_USERNAME")]
    pub username: Option<String>,

    /// API key used for Basic authentication
    #[arg(long, env = "TAG_DOWNLOADER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Space-separated tag query (e.g. "character:x rating:s")
    #[arg(short, long)]
    pub tags: Option<String>,

    /// Directory to save files into
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum number of items to download (0 = no cap)
    #[arg(short = 'n', long)]
    pub limit: Option<u32>,

    /// API root URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Seconds to wait between requests (0-60)
    #[arg(long, value_parser = parse_delay)]
    pub delay: Option<f64>,

    /// Override the identifying User-Agent
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Safety ceiling on items fetched per run
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_items: Option<u32>,

    /// JSON config file (overrides the default config location)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Default tracing level derived from `-q` / `-v`.
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Flags as a config layer; unset flags leave lower layers untouched.
    pub fn to_partial_config(&self) -> PartialConfig {
        PartialConfig {
            credentials: PartialCredentials {
                username: self.username.clone(),
                api_key: self.api_key.clone(),
            },
            download: PartialDownload {
                tags: self.tags.clone(),
                save_directory: self.output_dir.clone(),
                limit: self.limit,
                max_items: self.max_items,
            },
            api: PartialApi {
                base_url: self.base_url.clone(),
                delay: self.delay,
                user_agent: self.user_agent.clone(),
            },
        }
    }
}

fn parse_delay(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a number of seconds"))?;
    if !(0.0..=60.0).contains(&value) {
        return Err(format!("delay must be between 0 and 60 seconds, got {value}"));
    }
    Ok(value)
}
