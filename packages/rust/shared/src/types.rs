//! Core domain types for ReelMiner runs.

use serde::{Deserialize, Serialize};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying a single pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Keyword
// ---------------------------------------------------------------------------

/// A normalized keyword: uppercase ASCII letters, digits and spaces, no
/// accents, trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keyword(String);

impl Keyword {
    /// Normalize a raw token. Returns `None` when nothing survives.
    ///
    /// Accented characters are decomposed (NFD) and their combining marks
    /// dropped before uppercasing, so `"Canción"` becomes `"CANCION"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let upper: String = raw
            .nfd()
            .filter(|c| !is_combining_mark(*c))
            .collect::<String>()
            .to_uppercase();

        let cleaned: String = upper
            .chars()
            .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == ' ')
            .collect();

        let trimmed = cleaned.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The normalized text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form, used for stopword lookups.
    pub fn to_lowercase(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Keyword {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Remote documents and files
// ---------------------------------------------------------------------------

/// The most recently modified document in the watched folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Remote file identifier.
    pub id: String,
    /// Document title, used as the history key.
    pub name: String,
    /// Plain-text body.
    pub text: String,
}

/// Result of pushing a local directory to remote storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    /// File names uploaded, in upload order.
    pub uploaded: Vec<String>,
}

// ---------------------------------------------------------------------------
// Catalog payloads
// ---------------------------------------------------------------------------

/// One video returned by the catalog search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogVideo {
    /// Catalog identifier.
    pub id: u64,
    /// Public page URL.
    #[serde(default)]
    pub url: String,
    /// Source width in pixels.
    #[serde(default)]
    pub width: u32,
    /// Source height in pixels.
    #[serde(default)]
    pub height: u32,
    /// Available renditions, in catalog order.
    #[serde(default)]
    pub video_files: Vec<VideoFile>,
}

/// A single downloadable rendition of a catalog video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFile {
    /// Rendition identifier.
    pub id: u64,
    /// Quality label (`hd`, `sd`, `uhd`).
    #[serde(default)]
    pub quality: Option<String>,
    /// MIME type, e.g. `video/mp4`.
    #[serde(default)]
    pub file_type: Option<String>,
    /// Rendition width; the catalog sometimes omits it.
    #[serde(default)]
    pub width: Option<u32>,
    /// Rendition height; the catalog sometimes omits it.
    #[serde(default)]
    pub height: Option<u32>,
    /// Direct download link.
    pub link: String,
}

/// Raw response of an asset download. Non-2xx statuses are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedAsset {
    /// HTTP status code.
    pub status: u16,
    /// `content-type` header, if any.
    pub content_type: Option<String>,
    /// Response body.
    pub bytes: Vec<u8>,
}

impl DownloadedAsset {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A file in a remote folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}
