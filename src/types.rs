//! Core types for manga-archiver

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identifier of a manga in the catalog
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct MangaId(pub String);

impl MangaId {
    /// Create a new MangaId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MangaId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for MangaId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for MangaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a chapter in the catalog
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ChapterId(pub String);

impl ChapterId {
    /// Create a new ChapterId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ChapterId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ChapterId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ChapterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A manga resolved from a title search
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Manga {
    /// Catalog identifier
    pub id: MangaId,

    /// Display title, when the catalog provided one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A single chapter release
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Chapter {
    /// Catalog identifier
    pub id: ChapterId,

    /// Chapter number parsed from `label`; `None` for extras, oneshots and
    /// other non-numeric releases
    pub number: Option<f64>,

    /// Raw chapter label as published by the catalog (e.g. "12", "12.5")
    pub label: Option<String>,

    /// Translated language code (e.g. "en", "es")
    pub language: String,

    /// Chapter title, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Chapter {
    /// Name of this chapter's directory inside a multi-chapter archive
    ///
    /// Uses the raw label so that "2.5" stays "2.5"; falls back to the parsed
    /// number and finally to the chapter id. Labels come from upstream, so the
    /// result is always a single path component: separators and control
    /// characters become `_` and runs of dots collapse to one.
    pub fn directory_name(&self) -> String {
        let name = self
            .label
            .as_deref()
            .and_then(path_component)
            .or_else(|| self.number.map(|n| n.to_string()))
            .or_else(|| path_component(self.id.as_str()))
            .unwrap_or_else(|| "unnamed".to_string());
        format!("chapter-{}", name)
    }
}

/// Reduce upstream text to something safe as one zip path component
///
/// Returns `None` when nothing meaningful is left (e.g. ".." or "/").
fn path_component(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        let c = if c == '/' || c == '\\' || c.is_control() { '_' } else { c };
        if c == '.' && out.ends_with('.') {
            continue;
        }
        out.push(c);
    }

    out.chars()
        .any(|c| c.is_alphanumeric())
        .then_some(out)
}

/// One page image of a chapter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Page {
    /// Absolute URL of the image
    pub url: String,

    /// 0-based position within the chapter; the only ordering key
    pub index: usize,
}

impl Page {
    /// Lower-cased file extension of the image, defaulting to `jpg`
    pub fn extension(&self) -> String {
        let path = url::Url::parse(&self.url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| self.url.clone());

        path.rsplit('/')
            .next()
            .and_then(|file| file.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "jpg".to_string())
    }

    /// Archive file name for this page: `page_<index + 1>.<ext>`
    pub fn file_name(&self) -> String {
        format!("page_{}.{}", self.index + 1, self.extension())
    }
}

/// Inclusive chapter-number range
///
/// `start <= end` is not enforced; a reversed range simply matches nothing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChapterRange {
    /// Lower bound (inclusive)
    pub start: f64,
    /// Upper bound (inclusive)
    pub end: f64,
}

impl ChapterRange {
    /// Create a new range
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Whether `number` lies within `[start, end]`
    pub fn contains(&self, number: f64) -> bool {
        number >= self.start && number <= self.end
    }
}

impl Default for ChapterRange {
    /// Chapters 0 to 10, the listing endpoint's default window
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 10.0,
        }
    }
}
