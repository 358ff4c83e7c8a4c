//! Wire types for the `posts.json` search endpoint.

use serde::Deserialize;

/// Response body of a search request.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PostsResponse {
    #[serde(default)]
    pub(crate) posts: Vec<Item>,
}

/// One matched post.
///
/// Only the id, the file URL/extension and the artist tag group are decoded;
/// every other field the server sends is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Item {
    /// Server-assigned post id.
    pub id: u64,
    /// File metadata; `null` for deleted or restricted posts.
    #[serde(default)]
    pub file: Option<FileInfo>,
    /// Categorised tags.
    #[serde(default)]
    pub tags: Option<TagGroups>,
}

/// File section of a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileInfo {
    /// Absolute download URL; absent when the server withholds it.
    #[serde(default)]
    pub url: Option<String>,
    /// Server-reported extension without the dot.
    #[serde(default)]
    pub ext: Option<String>,
}

/// Tag groups of a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TagGroups {
    /// Attribution tags, most relevant first.
    #[serde(default)]
    pub artist: Vec<String>,
}

impl Item {
    /// Builds an item by hand (used by front-ends replaying cached metadata, and tests).
    #[must_use]
    pub fn new(id: u64, file_url: Option<&str>, artists: &[&str]) -> Self {
        Self {
            id,
            file: Some(FileInfo {
                url: file_url.map(str::to_string),
                ext: None,
            }),
            tags: Some(TagGroups {
                artist: artists.iter().map(|a| (*a).to_string()).collect(),
            }),
        }
    }

    /// Non-empty file URL, if the server supplied one.
    #[must_use]
    pub fn file_url(&self) -> Option<&str> {
        self.file
            .as_ref()
            .and_then(|file| file.url.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Server-reported extension, if any.
    #[must_use]
    pub fn server_extension(&self) -> Option<&str> {
        self.file
            .as_ref()
            .and_then(|file| file.ext.as_deref())
            .map(str::trim)
            .filter(|ext| !ext.is_empty())
    }

    /// First non-blank attribution tag.
    #[must_use]
    pub fn primary_artist(&self) -> Option<&str> {
        self.tags
            .as_ref()?
            .artist
            .first()
            .map(|artist| artist.trim())
            .filter(|artist| !artist.is_empty())
    }
}
