//! reqwest implementation of [`CatalogSource`] for MangaDex-compatible APIs

use super::CatalogSource;
use super::wire::{AtHomeServer, ChapterData, ChapterList, MangaList};
use crate::config::UpstreamConfig;
use crate::error::{Error, Result, UpstreamError};
use crate::filter::parse_chapter_number;
use crate::types::{Chapter, ChapterId, Manga, MangaId, Page};
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Catalog client speaking the MangaDex REST API
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct MangaDexClient {
    http: reqwest::Client,
    base_url: String,
    follow_pagination: bool,
    max_chapter_pages: u32,
    data_saver: bool,
}

impl MangaDexClient {
    /// Build a client with its own connection pool, per-call timeout and User-Agent
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: Some("upstream".to_string()),
            })?;

        Ok(Self::with_client(http, config))
    }

    /// Build a client around an existing reqwest client
    pub fn with_client(http: reqwest::Client, config: &UpstreamConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            follow_pagination: config.follow_pagination,
            max_chapter_pages: config.max_chapter_pages.max(1),
            data_saver: config.data_saver,
        }
    }

    async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<reqwest::Response, UpstreamError> {
        debug!(url, "upstream request");

        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<T, UpstreamError> {
        let body = self
            .get(url, query)
            .await?
            .bytes()
            .await
            .map_err(|e| UpstreamError::from_reqwest(url, e))?;

        serde_json::from_slice(&body).map_err(|e| UpstreamError::Parse {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

fn into_chapter(data: ChapterData) -> Chapter {
    let number = data.attributes.chapter.as_deref().and_then(parse_chapter_number);
    Chapter {
        id: ChapterId(data.id),
        number,
        label: data.attributes.chapter,
        language: data.attributes.translated_language,
        title: data.attributes.title.filter(|t| !t.is_empty()),
    }
}

#[async_trait]
impl CatalogSource for MangaDexClient {
    async fn resolve_manga(&self, title: &str) -> Result<Manga> {
        let url = format!("{}/manga", self.base_url);
        let list: MangaList = self.get_json(&url, &[("title", title.to_string())]).await?;

        let first = list
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("manga titled {:?}", title)))?;

        if first.id.is_empty() {
            return Err(UpstreamError::Parse {
                url,
                reason: "manga without id".to_string(),
            }
            .into());
        }

        debug!(title, manga_id = %first.id, "resolved title");
        Ok(Manga {
            title: first.attributes.as_ref().and_then(|a| a.display_title()),
            id: MangaId(first.id),
        })
    }

    async fn list_chapters(
        &self,
        manga_id: &MangaId,
        languages: &[String],
        page_limit: u32,
    ) -> std::result::Result<Vec<Chapter>, UpstreamError> {
        let url = format!("{}/chapter", self.base_url);
        let max_pages = if self.follow_pagination {
            self.max_chapter_pages
        } else {
            1
        };

        let mut chapters = Vec::new();
        let mut offset: u64 = 0;

        for _ in 0..max_pages {
            let mut query = vec![("manga", manga_id.to_string())];
            for language in languages {
                query.push(("translatedLanguage[]", language.clone()));
            }
            query.push(("order[chapter]", "asc".to_string()));
            query.push(("limit", page_limit.to_string()));
            if offset > 0 {
                query.push(("offset", offset.to_string()));
            }

            let page: ChapterList = self.get_json(&url, &query).await?;
            let fetched = page.data.len() as u64;
            chapters.extend(page.data.into_iter().map(into_chapter));
            offset += fetched;

            let total = page.total.unwrap_or(offset);
            if fetched == 0 || offset >= total {
                break;
            }
        }

        debug!(manga_id = %manga_id, count = chapters.len(), "listed chapters");
        Ok(chapters)
    }

    async fn resolve_pages(
        &self,
        chapter_id: &ChapterId,
    ) -> std::result::Result<Vec<Page>, UpstreamError> {
        let url = format!("{}/at-home/server/{}", self.base_url, chapter_id);
        let server: AtHomeServer = self.get_json(&url, &[]).await?;

        let base = server.base_url.trim_end_matches('/');
        let (quality, files) = if self.data_saver {
            ("data-saver", server.chapter.data_saver)
        } else {
            ("data", server.chapter.data)
        };

        Ok(files
            .into_iter()
            .enumerate()
            .map(|(index, file)| Page {
                url: format!("{}/{}/{}/{}", base, quality, server.chapter.hash, file),
                index,
            })
            .collect())
    }

    async fn fetch_page(&self, page: &Page) -> std::result::Result<Bytes, UpstreamError> {
        self.get(&page.url, &[])
            .await?
            .bytes()
            .await
            .map_err(|e| UpstreamError::from_reqwest(&page.url, e))
    }
}
