//! Shared fixtures for unit tests

use crate::catalog::CatalogSource;
use crate::error::{ArchiveError, Error, Result, UpstreamError};
use crate::filter::parse_chapter_number;
use crate::types::{Chapter, ChapterId, Manga, MangaId, Page};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// In-memory catalog
///
/// Page URLs look like `fake://<chapter>/<file>` and, unless overridden, a
/// page's bytes are the UTF-8 string `<chapter>/<file>`.
#[derive(Default)]
pub(crate) struct FakeCatalog {
    manga: Vec<(String, Manga)>,
    chapters: HashMap<String, Vec<Chapter>>,
    broken_listings: HashSet<String>,
    pages: HashMap<String, Option<Vec<String>>>,
    failing_pages: HashSet<String>,
    hanging_pages: HashSet<String>,
    delays: HashMap<String, Duration>,
    bodies: HashMap<String, Bytes>,
    calls: Arc<AtomicUsize>,
    resolved: Arc<Mutex<Vec<String>>>,
}

/// URL the fake catalog assigns to `file` of `chapter`
pub(crate) fn page_url(chapter: &str, file: &str) -> String {
    format!("fake://{chapter}/{file}")
}

/// Bytes the fake catalog serves for `file` of `chapter`
pub(crate) fn page_bytes(chapter: &str, file: &str) -> Vec<u8> {
    format!("{chapter}/{file}").into_bytes()
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a manga reachable by exact title
    pub fn with_manga(mut self, title: &str, id: &str) -> Self {
        self.manga.push((
            title.to_string(),
            Manga {
                id: MangaId::new(id),
                title: Some(title.to_string()),
            },
        ));
        self
    }

    /// Register a chapter listing; each entry is `(chapter_id, label, language)`
    pub fn with_listing(mut self, manga_id: &str, chapters: &[(&str, Option<&str>, &str)]) -> Self {
        let listing = chapters
            .iter()
            .map(|(id, label, language)| Chapter {
                id: ChapterId::new(*id),
                number: label.and_then(parse_chapter_number),
                label: label.map(str::to_string),
                language: language.to_string(),
                title: None,
            })
            .collect();
        self.chapters.insert(manga_id.to_string(), listing);
        self
    }

    /// Make the chapter listing of `manga_id` fail
    pub fn with_broken_listing(mut self, manga_id: &str) -> Self {
        self.broken_listings.insert(manga_id.to_string());
        self
    }

    /// Register the page files of a chapter
    pub fn with_chapter(mut self, chapter_id: &str, files: &[&str]) -> Self {
        self.pages.insert(
            chapter_id.to_string(),
            Some(files.iter().map(|f| f.to_string()).collect()),
        );
        self
    }

    /// Make page resolution of `chapter_id` fail
    pub fn with_broken_chapter(mut self, chapter_id: &str) -> Self {
        self.pages.insert(chapter_id.to_string(), None);
        self
    }

    /// Make fetching one page fail with HTTP 500
    pub fn with_failing_page(mut self, chapter_id: &str, file: &str) -> Self {
        self.failing_pages.insert(page_url(chapter_id, file));
        self
    }

    /// Make fetching one page never complete
    pub fn with_hanging_page(mut self, chapter_id: &str, file: &str) -> Self {
        self.hanging_pages.insert(page_url(chapter_id, file));
        self
    }

    /// Delay the response for one page
    pub fn with_delay(mut self, chapter_id: &str, file: &str, delay: Duration) -> Self {
        self.delays.insert(page_url(chapter_id, file), delay);
        self
    }

    /// Serve `body` for one page instead of its default bytes
    pub fn with_page_body(mut self, chapter_id: &str, file: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(page_url(chapter_id, file), Bytes::from(body));
        self
    }

    /// Shared counter of every call made against this catalog
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Chapter ids whose page lists were requested, in request order
    pub fn resolved_chapters(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.resolved)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn resolve_manga(&self, title: &str) -> Result<Manga> {
        self.record_call();
        self.manga
            .iter()
            .find(|(t, _)| t == title)
            .map(|(_, manga)| manga.clone())
            .ok_or_else(|| Error::NotFound(format!("manga titled {title:?}")))
    }

    async fn list_chapters(
        &self,
        manga_id: &MangaId,
        languages: &[String],
        page_limit: u32,
    ) -> std::result::Result<Vec<Chapter>, UpstreamError> {
        self.record_call();
        if self.broken_listings.contains(manga_id.as_str()) {
            return Err(UpstreamError::Status {
                url: format!("fake://manga/{manga_id}/feed"),
                status: 503,
            });
        }

        Ok(self
            .chapters
            .get(manga_id.as_str())
            .map(|chapters| {
                chapters
                    .iter()
                    .filter(|c| languages.contains(&c.language))
                    .take(page_limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn resolve_pages(
        &self,
        chapter_id: &ChapterId,
    ) -> std::result::Result<Vec<Page>, UpstreamError> {
        self.record_call();
        self.resolved.lock().unwrap().push(chapter_id.to_string());
        match self.pages.get(chapter_id.as_str()) {
            Some(Some(files)) => Ok(files
                .iter()
                .enumerate()
                .map(|(index, file)| Page {
                    url: page_url(chapter_id.as_str(), file),
                    index,
                })
                .collect()),
            Some(None) => Err(UpstreamError::Status {
                url: format!("fake://at-home/{chapter_id}"),
                status: 500,
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_page(&self, page: &Page) -> std::result::Result<Bytes, UpstreamError> {
        self.record_call();
        if let Some(delay) = self.delays.get(&page.url) {
            tokio::time::sleep(*delay).await;
        }
        if self.hanging_pages.contains(&page.url) {
            std::future::pending::<()>().await;
        }
        if self.failing_pages.contains(&page.url) {
            return Err(UpstreamError::Status {
                url: page.url.clone(),
                status: 500,
            });
        }

        if let Some(body) = self.bodies.get(&page.url) {
            return Ok(body.clone());
        }

        let path = page.url.trim_start_matches("fake://");
        Ok(Bytes::from(path.as_bytes().to_vec()))
    }
}

/// Drain an archive channel; returns the bytes received and the terminal error, if any
pub(crate) async fn collect_archive(
    mut rx: mpsc::Receiver<std::result::Result<Bytes, ArchiveError>>,
) -> (Vec<u8>, Option<ArchiveError>) {
    let mut bytes = Vec::new();
    while let Some(item) = rx.recv().await {
        match item {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(e) => return (bytes, Some(e)),
        }
    }
    (bytes, None)
}

/// Entries of a zip archive as `(name, contents)` in archive order
#[allow(clippy::unwrap_used)]
pub(crate) fn zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut contents = Vec::new();
            file.read_to_end(&mut contents).unwrap();
            (file.name().to_string(), contents)
        })
        .collect()
}
