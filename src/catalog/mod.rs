//! Upstream catalog access
//!
//! The core abstraction is the [`CatalogSource`] trait: everything the pipeline
//! needs from the outside world (title search, chapter listings, page
//! descriptors and page bytes) goes through it.
//!
//! - [`MangaDexClient`]: reqwest implementation against a MangaDex-compatible API

use crate::error::{Result, UpstreamError};
use crate::types::{Chapter, ChapterId, Manga, MangaId, Page};
use async_trait::async_trait;
use bytes::Bytes;

mod client;
mod wire;

pub use client::MangaDexClient;

/// Typed accessor over the upstream catalog/content service
///
/// Implementations own request shaping and response parsing. None of the
/// methods retry; failures are reported once and propagate to the caller.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Resolve a title to a manga
    ///
    /// First-match policy: when several candidates come back, the first one in
    /// upstream order wins.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`](crate::Error::NotFound) if nothing matches,
    /// [`Error::Upstream`](crate::Error::Upstream) if the request fails.
    async fn resolve_manga(&self, title: &str) -> Result<Manga>;

    /// List chapters of a manga translated into any of `languages`, ascending
    /// by chapter number as ordered by the source
    ///
    /// `page_limit` caps the number of chapters requested per listing call.
    /// An empty listing is not an error.
    async fn list_chapters(
        &self,
        manga_id: &MangaId,
        languages: &[String],
        page_limit: u32,
    ) -> std::result::Result<Vec<Chapter>, UpstreamError>;

    /// Resolve the ordered page images of a chapter
    ///
    /// A chapter without pages yields an empty vector, never an error.
    async fn resolve_pages(
        &self,
        chapter_id: &ChapterId,
    ) -> std::result::Result<Vec<Page>, UpstreamError>;

    /// Download the bytes of one page image
    async fn fetch_page(&self, page: &Page) -> std::result::Result<Bytes, UpstreamError>;
}
