//! Configuration lifecycle: load file config, merge CLI flags, resolve a `RunConfig`.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tag_downloader::config::{PartialConfig, RunConfig};
use tracing::debug;

use crate::cli::Args;

const CONFIG_DIR_NAME: &str = "tag-downloader";
const CONFIG_FILE_NAME: &str = "config.json";

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/tag-downloader/config.json`
/// 2. `$HOME/.config/tag-downloader/config.json`
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the file layer: `--config` when given (must exist), otherwise the
/// default path when present, otherwise an empty layer.
fn load_file_layer(explicit: Option<&PathBuf>) -> Result<PartialConfig> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading config file from --config");
        return PartialConfig::from_file(path)
            .with_context(|| format!("failed to load config file {}", path.display()));
    }

    match resolve_default_config_path() {
        Some(path) if path.exists() => {
            debug!(path = %path.display(), "loading default config file");
            PartialConfig::from_file(&path)
                .with_context(|| format!("failed to load config file {}", path.display()))
        }
        _ => Ok(PartialConfig::default()),
    }
}

/// Merges the file layer with CLI flags (flags win) and validates the result.
pub(crate) fn resolve_config(args: &Args) -> Result<RunConfig> {
    let file_layer = load_file_layer(args.config.as_ref())?;
    let config = file_layer
        .merge(args.to_partial_config())
        .resolve()
        .context("invalid configuration")?;
    debug!(
        username = %config.credentials.username,
        tags = %config.download.tags,
        save_directory = %config.download.save_directory.display(),
        item_cap = config.download.item_cap,
        "configuration resolved"
    );
    Ok(config)
}
