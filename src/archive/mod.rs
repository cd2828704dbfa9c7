//! Streaming zip composition
//!
//! The [`ArchiveStreamer`] turns an ordered list of [`ArchiveUnit`]s (one per
//! chapter) into a zip byte stream delivered over a bounded channel. Pages are
//! fetched with a small in-order prefetch window, written as individual
//! deflated entries and forwarded as soon as each entry is written, so peak
//! memory is bounded by the prefetch window plus the channel capacity rather
//! than by archive size.
//!
//! # Failure handling
//!
//! With [`FailurePolicy::AbortAll`] the first failure stops the stream: an
//! `Err` is sent as the final item and the central directory is never written,
//! so the receiver ends up with an unfinalized archive. With
//! [`FailurePolicy::SkipAndContinue`] failed pages (and chapters whose page list
//! cannot be resolved) are left out and listed in a trailing
//! [`FAILED_PAGES_ENTRY`] manifest.
//!
//! Dropping the receiver cancels the stream at its next await point.

use crate::catalog::CatalogSource;
use crate::config::{ArchiveConfig, FailurePolicy};
use crate::error::ArchiveError;
use crate::pages::PageResolver;
use crate::types::{Chapter, ChapterId, Page};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::io::{Seek, Write};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

mod buffer;

use buffer::ChunkBuffer;

/// Name of the manifest entry written under [`FailurePolicy::SkipAndContinue`]
pub const FAILED_PAGES_ENTRY: &str = "failed-pages.json";

/// One item of the archive byte stream
pub type ArchiveChunk = std::result::Result<Bytes, ArchiveError>;

/// One chapter's worth of archive entries
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveUnit {
    /// Chapter whose pages make up this unit
    pub chapter_id: ChapterId,

    /// Directory the pages are placed in; `None` writes them at the archive root
    pub directory: Option<String>,
}

impl ArchiveUnit {
    /// Unit whose pages sit at the archive root (single-chapter archives)
    pub fn at_root(chapter_id: ChapterId) -> Self {
        Self {
            chapter_id,
            directory: None,
        }
    }

    /// Unit whose pages sit under `directory/`
    pub fn in_directory(chapter_id: ChapterId, directory: impl Into<String>) -> Self {
        Self {
            chapter_id,
            directory: Some(directory.into()),
        }
    }

    /// Archive path of `page` within this unit
    pub fn entry_path(&self, page: &Page) -> String {
        match &self.directory {
            Some(dir) => format!("{}/{}", dir, page.file_name()),
            None => page.file_name(),
        }
    }
}

/// Build one unit per chapter, each in its own `chapter-<label>` directory
///
/// Chapters sharing a label (alternate releases of the same number) would
/// collide, so the second and later ones get a `_v<k>` suffix:
/// `chapter-5`, `chapter-5_v2`, `chapter-5_v3`. The suffix skips any name
/// already taken, including one that came verbatim from a label.
pub fn units_for_chapters(chapters: &[Chapter]) -> Vec<ArchiveUnit> {
    let mut taken: HashSet<String> = HashSet::new();

    chapters
        .iter()
        .map(|chapter| {
            let base = chapter.directory_name();
            let mut directory = base.clone();
            let mut k = 1;
            while taken.contains(&directory) {
                k += 1;
                directory = format!("{}_v{}", base, k);
            }
            taken.insert(directory.clone());
            ArchiveUnit::in_directory(chapter.id.clone(), directory)
        })
        .collect()
}

/// A page (or whole chapter) left out of the archive
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedPage {
    /// Chapter the failure belongs to
    pub chapter_id: String,

    /// Archive path the page would have had; absent when the chapter's page
    /// list itself could not be resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Source URL of the page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Rendered failure
    pub error: String,
}

/// What a completed archive contains
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Page entries written
    pub entries: usize,

    /// Uncompressed page bytes written
    pub page_bytes: u64,

    /// Compressed bytes handed to the receiver
    pub archive_bytes: u64,

    /// Pages or chapters skipped under [`FailurePolicy::SkipAndContinue`]
    pub failed: Vec<FailedPage>,
}

/// Streams zip archives of chapter pages
#[derive(Clone)]
pub struct ArchiveStreamer {
    catalog: Arc<dyn CatalogSource>,
    resolver: PageResolver,
    config: ArchiveConfig,
}

impl ArchiveStreamer {
    /// Create a streamer fetching pages from `catalog`
    pub fn new(catalog: Arc<dyn CatalogSource>, config: ArchiveConfig) -> Self {
        Self {
            resolver: PageResolver::new(Arc::clone(&catalog)),
            catalog,
            config,
        }
    }

    /// Compose the archive on a background task
    ///
    /// The returned receiver yields the archive bytes in order. It is closed
    /// after the last chunk, or right after an `Err` item if the archive was
    /// aborted.
    pub fn spawn(&self, units: Vec<ArchiveUnit>) -> mpsc::Receiver<ArchiveChunk> {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let streamer = self.clone();

        tokio::spawn(async move {
            // Outcome is already logged and, for errors, delivered through the channel
            let _ = streamer.stream(units, tx).await;
        });

        rx
    }

    /// Compose the archive, sending its bytes into `sink`
    ///
    /// On a non-cancellation failure the error is also sent into `sink` so the
    /// receiver can tell a truncated archive from a complete one.
    pub async fn stream(
        &self,
        units: Vec<ArchiveUnit>,
        sink: mpsc::Sender<ArchiveChunk>,
    ) -> std::result::Result<ArchiveSummary, ArchiveError> {
        let chapters = units.len();

        match self.write_archive(units, &sink).await {
            Ok(summary) => {
                info!(
                    chapters,
                    entries = summary.entries,
                    failed = summary.failed.len(),
                    archive_bytes = summary.archive_bytes,
                    "archive finalized"
                );
                Ok(summary)
            }
            Err(ArchiveError::Cancelled) => {
                info!(chapters, "archive stream cancelled by receiver");
                Err(ArchiveError::Cancelled)
            }
            Err(e) => {
                error!(chapters, error = %e, "archive aborted");
                let _ = sink.send(Err(e.clone())).await;
                Err(e)
            }
        }
    }

    async fn write_archive(
        &self,
        units: Vec<ArchiveUnit>,
        sink: &mpsc::Sender<ArchiveChunk>,
    ) -> std::result::Result<ArchiveSummary, ArchiveError> {
        let buffer = ChunkBuffer::default();
        let mut zip = ZipWriter::new_stream(buffer.clone());
        let mut summary = ArchiveSummary::default();
        let skip_failures = self.config.failure_policy == FailurePolicy::SkipAndContinue;

        for unit in &units {
            let pages = match until_closed(sink, self.resolver.resolve(&unit.chapter_id)).await? {
                Ok(pages) => pages,
                Err(e) if skip_failures => {
                    warn!(chapter_id = %unit.chapter_id, error = %e, "skipping chapter");
                    summary.failed.push(FailedPage {
                        chapter_id: unit.chapter_id.to_string(),
                        path: None,
                        url: None,
                        error: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            debug!(chapter_id = %unit.chapter_id, pages = pages.len(), "writing chapter");

            let mut fetches = stream::iter(pages)
                .map(|page| {
                    let catalog = Arc::clone(&self.catalog);
                    async move {
                        let result = catalog.fetch_page(&page).await;
                        (page, result)
                    }
                })
                .buffered(self.config.prefetch_concurrency.max(1))
                .boxed();

            while let Some((page, result)) = until_closed(sink, fetches.next()).await? {
                let path = unit.entry_path(&page);

                match result {
                    Ok(bytes) => {
                        let page_len = bytes.len() as u64;
                        zip = write_entry(zip, path, bytes, self.config.compression_level).await?;
                        summary.entries += 1;
                        summary.page_bytes += page_len;
                        summary.archive_bytes += forward(sink, &buffer).await?;
                    }
                    Err(source) if skip_failures => {
                        warn!(chapter_id = %unit.chapter_id, path = %path, error = %source, "skipping page");
                        summary.failed.push(FailedPage {
                            chapter_id: unit.chapter_id.to_string(),
                            path: Some(path),
                            url: Some(page.url),
                            error: source.to_string(),
                        });
                    }
                    Err(source) => return Err(ArchiveError::PageFetch { path, source }),
                }
            }
        }

        if !summary.failed.is_empty() {
            let manifest = serde_json::to_vec_pretty(&summary.failed)
                .map_err(|e| ArchiveError::Zip(e.to_string()))?;
            zip = write_entry(
                zip,
                FAILED_PAGES_ENTRY.to_string(),
                Bytes::from(manifest),
                self.config.compression_level,
            )
            .await?;
        }

        tokio::task::spawn_blocking(move || zip.finish())
            .await
            .map_err(writer_panicked)??;
        summary.archive_bytes += forward(sink, &buffer).await?;

        Ok(summary)
    }
}

/// Compress one entry on the blocking pool and hand the writer back
///
/// Deflate over a full page image is CPU-bound, so it stays off the runtime
/// workers. The writer moves into the blocking task and back, so there is
/// still exactly one writer and entries keep their order.
async fn write_entry<W>(
    mut zip: ZipWriter<W>,
    path: String,
    contents: Bytes,
    level: u32,
) -> std::result::Result<ZipWriter<W>, ArchiveError>
where
    W: Write + Seek + Send + 'static,
{
    tokio::task::spawn_blocking(move || -> std::result::Result<ZipWriter<W>, ArchiveError> {
        zip.start_file(path, entry_options(level))?;
        zip.write_all(&contents)?;
        Ok(zip)
    })
    .await
    .map_err(writer_panicked)?
}

fn writer_panicked(e: tokio::task::JoinError) -> ArchiveError {
    ArchiveError::Zip(format!("archive writer task panicked: {}", e))
}

fn entry_options(level: u32) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(i64::from(level)))
}

/// Send whatever the writer produced since the last call; returns the byte count
async fn forward(
    sink: &mpsc::Sender<ArchiveChunk>,
    buffer: &ChunkBuffer,
) -> std::result::Result<u64, ArchiveError> {
    let chunk = buffer.take();
    if chunk.is_empty() {
        return Ok(0);
    }

    let len = chunk.len() as u64;
    sink.send(Ok(chunk))
        .await
        .map_err(|_| ArchiveError::Cancelled)?;
    Ok(len)
}

/// Run `fut` unless the receiver goes away first
async fn until_closed<F: Future>(
    sink: &mpsc::Sender<ArchiveChunk>,
    fut: F,
) -> std::result::Result<F::Output, ArchiveError> {
    tokio::select! {
        biased;
        _ = sink.closed() => Err(ArchiveError::Cancelled),
        output = fut => Ok(output),
    }
}
