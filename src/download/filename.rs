//! Filename sanitization and path derivation for downloads.
//!
//! Every name that reaches the filesystem goes through [`sanitize_filename`],
//! and the staging path for an in-progress transfer is always derived from the
//! sanitized final name via [`partial_path_for`].

use std::path::{Component, Path, PathBuf};

use url::Url;

/// Maximum filename length in characters after sanitization.
pub const MAX_FILENAME_CHARS: usize = 100;

/// Suffix appended to the final filename while a transfer is in progress.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Maximum filename length in bytes, leaving room for [`PARTIAL_SUFFIX`]
/// under the common 255-byte filesystem name limit.
pub const MAX_FILENAME_BYTES: usize = 255 - PARTIAL_SUFFIX.len();

/// Characters stripped from filenames (invalid on at least one common filesystem).
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Longest extension accepted from a URL (including the leading dot).
const MAX_EXTENSION_LEN: usize = 12;

/// Sanitizes a filename for filesystem safety.
///
/// - Removes `< > : " / \ | ? *` and control characters
/// - Collapses whitespace runs to a single space and trims both ends
/// - Rewrites pure dot segments (`.`, `..`) so they cannot escape the directory
/// - Truncates names longer than [`MAX_FILENAME_CHARS`] characters or
///   [`MAX_FILENAME_BYTES`] bytes on a char boundary, keeping the final
///   extension segment
///
/// # Example
///
/// ```
/// use tag_downloader::download::sanitize_filename;
///
/// assert_eq!(sanitize_filename("foo:bar/baz*.png"), "foobarbaz.png");
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let stripped: String = name
        .chars()
        .filter(|c| !RESERVED_CHARS.contains(c) && !(c.is_control() && !c.is_whitespace()))
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        return "_".to_string();
    }

    let safe = if is_safe_filename_segment(&collapsed) {
        collapsed
    } else {
        collapsed.replace('.', "_")
    };

    truncate_preserving_extension(&safe, MAX_FILENAME_CHARS, MAX_FILENAME_BYTES)
}

fn truncate_preserving_extension(name: &str, max_chars: usize, max_bytes: usize) -> String {
    if name.chars().count() <= max_chars && name.len() <= max_bytes {
        return name.to_string();
    }

    if let Some((base, ext)) = name.rsplit_once('.') {
        let ext_chars = ext.chars().count();
        // The base keeps at least one character, otherwise we fall through to a plain cut.
        if !base.is_empty() && ext_chars + 2 <= max_chars && ext.len() + 2 <= max_bytes {
            let base = prefix_within(base, max_chars - ext_chars - 1, max_bytes - ext.len() - 1);
            let base = base.trim_end();
            if !base.is_empty() {
                return format!("{base}.{ext}");
            }
        }
    }

    prefix_within(name, max_chars, max_bytes).to_string()
}

/// Longest prefix of `s` with at most `max_chars` characters and `max_bytes` bytes.
fn prefix_within(s: &str, max_chars: usize, max_bytes: usize) -> &str {
    let end = s
        .char_indices()
        .take(max_chars)
        .map(|(index, c)| index + c.len_utf8())
        .take_while(|end| *end <= max_bytes)
        .last()
        .unwrap_or(0);
    &s[..end]
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// Returns the staging path for `final_path` (`<final><PARTIAL_SUFFIX>`).
#[must_use]
pub fn partial_path_for(final_path: &Path) -> PathBuf {
    let mut staged = final_path.as_os_str().to_owned();
    staged.push(PARTIAL_SUFFIX);
    PathBuf::from(staged)
}

/// Extracts the trailing file extension (without the dot, lowercased) from a URL path.
///
/// Query strings and fragments are ignored. Returns `None` when the last path
/// segment has no usable extension.
#[must_use]
pub fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let decoded = urlencoding::decode(last_segment).unwrap_or_else(|_| last_segment.into());
    let dot_index = decoded.rfind('.')?;
    let ext = &decoded[dot_index..];
    if ext.len() <= 1 || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    let ext = &ext[1..];
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
