//! Page resolution stage

use crate::catalog::CatalogSource;
use crate::error::PageResolutionError;
use crate::types::{ChapterId, Page};
use std::sync::Arc;

/// Resolves a chapter's ordered page images through the catalog
#[derive(Clone)]
pub struct PageResolver {
    catalog: Arc<dyn CatalogSource>,
}

impl PageResolver {
    /// Create a resolver backed by `catalog`
    pub fn new(catalog: Arc<dyn CatalogSource>) -> Self {
        Self { catalog }
    }

    /// Pages of `chapter_id` ordered by index; empty when the chapter has none
    pub async fn resolve(
        &self,
        chapter_id: &ChapterId,
    ) -> std::result::Result<Vec<Page>, PageResolutionError> {
        self.catalog
            .resolve_pages(chapter_id)
            .await
            .map_err(|source| PageResolutionError {
                chapter_id: chapter_id.to_string(),
                source,
            })
    }
}
