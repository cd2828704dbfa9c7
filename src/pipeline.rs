//! Request-scoped orchestration of the archival pipeline
//!
//! [`Pipeline`] wires the catalog, the range filter, the page resolver and the
//! archive streamer together. Every call is independent; the only state shared
//! between requests is the catalog's connection pool.

use crate::archive::{ArchiveChunk, ArchiveStreamer, ArchiveUnit, units_for_chapters};
use crate::catalog::CatalogSource;
use crate::config::Config;
use crate::error::{ArchiveError, Error, Result};
use crate::filter::filter_by_range;
use crate::types::{Chapter, ChapterId, ChapterRange, MangaId};
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

/// An archive being produced on a background task
///
/// Holds the receiving end of the archive byte stream together with the file
/// name the archive should be served under. Dropping it cancels the producer.
#[derive(Debug)]
pub struct ArchiveDownload {
    file_name: String,
    receiver: mpsc::Receiver<ArchiveChunk>,
}

impl ArchiveDownload {
    /// File name for the `Content-Disposition` header
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Wait for the first chunk of the archive
    ///
    /// If the producer fails before emitting any bytes, that failure is
    /// returned here so it can still be reported as a regular error response.
    /// Otherwise the whole archive (first chunk included) is returned as a
    /// byte stream; a later failure surfaces as an `Err` item of that stream.
    pub async fn start(
        mut self,
    ) -> Result<impl Stream<Item = std::result::Result<Bytes, ArchiveError>> + Send + 'static> {
        let first = match self.receiver.recv().await {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => return Err(Error::Archive(e)),
            // The producer always finishes with an end-of-archive record, so an
            // empty close means it went away without reporting anything
            None => return Err(Error::Archive(ArchiveError::Cancelled)),
        };

        Ok(stream::once(async move { Ok(first) }).chain(ReceiverStream::new(self.receiver)))
    }

    /// Collect the whole archive into memory
    pub async fn into_bytes(self) -> Result<Vec<u8>> {
        let mut body = Box::pin(self.start().await?);
        let mut bytes = Vec::new();
        while let Some(chunk) = body.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        Ok(bytes)
    }
}

/// Composes catalog lookups, range filtering and archive streaming per request
#[derive(Clone)]
pub struct Pipeline {
    catalog: Arc<dyn CatalogSource>,
    streamer: ArchiveStreamer,
    metadata_languages: Vec<String>,
    chapter_page_limit: u32,
}

impl Pipeline {
    /// Create a pipeline over `catalog`
    pub fn new(catalog: Arc<dyn CatalogSource>, config: &Config) -> Self {
        Self {
            streamer: ArchiveStreamer::new(Arc::clone(&catalog), config.archive.clone()),
            catalog,
            metadata_languages: config.pipeline.metadata_languages.clone(),
            chapter_page_limit: config.upstream.chapter_page_limit,
        }
    }

    /// Resolve a title to a manga id
    ///
    /// # Errors
    ///
    /// `Validation` for an empty title (no upstream call is made), `NotFound`
    /// when nothing matches, `Upstream` when the catalog fails.
    pub async fn search(&self, title: &str) -> Result<MangaId> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::Validation("\"title\" must not be empty".into()));
        }

        let manga = self.catalog.resolve_manga(title).await?;
        info!(title, manga_id = %manga.id, "resolved title");
        Ok(manga.id)
    }

    /// Chapters of `manga_id` whose number lies in `range`
    ///
    /// Metadata only; uses the configured metadata languages.
    pub async fn chapters_in_range(
        &self,
        manga_id: &MangaId,
        range: ChapterRange,
    ) -> Result<Vec<Chapter>> {
        let chapters = self
            .catalog
            .list_chapters(manga_id, &self.metadata_languages, self.chapter_page_limit)
            .await?;
        Ok(filter_by_range(&chapters, range))
    }

    /// Archive of a single chapter with its pages at the archive root
    pub async fn chapter_archive(
        &self,
        chapter_id: &ChapterId,
        language: &str,
    ) -> Result<ArchiveDownload> {
        let language = require_language(language)?;
        info!(chapter_id = %chapter_id, language, "starting chapter archive");

        let receiver = self
            .streamer
            .spawn(vec![ArchiveUnit::at_root(chapter_id.clone())]);

        Ok(ArchiveDownload {
            file_name: format!("chapter-{}-{}.zip", chapter_id, language),
            receiver,
        })
    }

    /// Archive of every chapter of `manga_id` in `language` whose number lies
    /// in `range`, one `chapter-<label>/` directory per chapter
    ///
    /// The chapter listing is fetched before anything is streamed, so listing
    /// failures are returned directly.
    pub async fn range_archive(
        &self,
        manga_id: &MangaId,
        language: &str,
        range: ChapterRange,
    ) -> Result<ArchiveDownload> {
        let language = require_language(language)?;

        let chapters = self
            .catalog
            .list_chapters(manga_id, &[language.to_string()], self.chapter_page_limit)
            .await?;
        let selected = filter_by_range(&chapters, range);

        if selected.is_empty() {
            warn!(
                manga_id = %manga_id,
                language,
                start = range.start,
                end = range.end,
                "no chapters in range; archive will be empty"
            );
        }
        info!(
            manga_id = %manga_id,
            language,
            listed = chapters.len(),
            selected = selected.len(),
            "starting range archive"
        );

        let receiver = self.streamer.spawn(units_for_chapters(&selected));

        Ok(ArchiveDownload {
            file_name: format!("manga-{}-{}-chapters.zip", manga_id, language),
            receiver,
        })
    }
}

fn require_language(language: &str) -> Result<&str> {
    let language = language.trim();
    if language.is_empty() {
        return Err(Error::Validation("\"lang\" must not be empty".into()));
    }
    Ok(language)
}
