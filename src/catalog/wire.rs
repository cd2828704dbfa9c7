//! Response shapes of the MangaDex API, reduced to the fields we read

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub(crate) struct MangaList {
    #[serde(default)]
    pub data: Vec<MangaData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MangaData {
    pub id: String,
    #[serde(default)]
    pub attributes: Option<MangaAttributes>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MangaAttributes {
    #[serde(default)]
    pub title: HashMap<String, String>,
}

impl MangaAttributes {
    /// English title when present, otherwise any title
    pub fn display_title(&self) -> Option<String> {
        self.title
            .get("en")
            .or_else(|| self.title.values().next())
            .cloned()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChapterList {
    #[serde(default)]
    pub data: Vec<ChapterData>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChapterData {
    pub id: String,
    pub attributes: ChapterAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChapterAttributes {
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub translated_language: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AtHomeServer {
    pub base_url: String,
    pub chapter: AtHomeChapter,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AtHomeChapter {
    pub hash: String,
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(default)]
    pub data_saver: Vec<String>,
}
