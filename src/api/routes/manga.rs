//! Manga handlers: title search, chapter listing and archive downloads.

use super::{
    ChaptersQuery, DownloadAllQuery, DownloadQuery, SearchQuery, SearchResponse, chapter_bound,
    required,
};
use crate::api::AppState;
use crate::error::Result;
use crate::pipeline::ArchiveDownload;
use crate::types::{Chapter, ChapterId, ChapterRange, MangaId};
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};

/// GET /manga/search - Resolve a title to a manga id
#[utoipa::path(
    get,
    path = "/api/manga/search",
    tag = "manga",
    params(SearchQuery),
    responses(
        (status = 200, description = "First matching manga", body = SearchResponse),
        (status = 400, description = "Missing title", body = crate::error::ApiError),
        (status = 404, description = "No manga matches the title", body = crate::error::ApiError),
        (status = 500, description = "Upstream failure", body = crate::error::ApiError)
    )
)]
pub async fn search_manga(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let title = required("title", query.title)?;
    let id = state.pipeline.search(&title).await?;
    Ok(Json(SearchResponse { id }))
}

/// GET /manga/:id/chapters - Chapters of a manga within a number range
#[utoipa::path(
    get,
    path = "/api/manga/{id}/chapters",
    tag = "manga",
    params(
        ("id" = String, Path, description = "Manga ID"),
        ChaptersQuery
    ),
    responses(
        (status = 200, description = "Chapters in range, in upstream order", body = Vec<Chapter>),
        (status = 400, description = "Malformed range bound", body = crate::error::ApiError),
        (status = 500, description = "Upstream failure", body = crate::error::ApiError)
    )
)]
pub async fn list_chapters(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ChaptersQuery>,
) -> Result<Json<Vec<Chapter>>> {
    let defaults = ChapterRange::default();
    let range = ChapterRange::new(
        chapter_bound("start", query.start.as_deref(), Some(defaults.start))?,
        chapter_bound("end", query.end.as_deref(), Some(defaults.end))?,
    );

    let chapters = state
        .pipeline
        .chapters_in_range(&MangaId::new(id), range)
        .await?;
    Ok(Json(chapters))
}

/// GET /manga/:id/download - Zip archive of a single chapter
///
/// `id` is a chapter id. Pages sit at the archive root as `page_<n>.<ext>`.
#[utoipa::path(
    get,
    path = "/api/manga/{id}/download",
    tag = "manga",
    params(
        ("id" = String, Path, description = "Chapter ID"),
        DownloadQuery
    ),
    responses(
        (status = 200, description = "Zip archive stream", content_type = "application/zip"),
        (status = 400, description = "Missing lang", body = crate::error::ApiError),
        (status = 500, description = "Archive could not be started", body = crate::error::ApiError)
    )
)]
pub async fn download_chapter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response> {
    let lang = required("lang", query.lang)?;
    let download = state
        .pipeline
        .chapter_archive(&ChapterId::new(id), &lang)
        .await?;
    zip_response(download).await
}

/// GET /manga/:id/downloadAll - Zip archive of every chapter in a range
///
/// `id` is a manga id. Each chapter gets its own `chapter-<label>/` directory.
#[utoipa::path(
    get,
    path = "/api/manga/{id}/downloadAll",
    tag = "manga",
    params(
        ("id" = String, Path, description = "Manga ID"),
        DownloadAllQuery
    ),
    responses(
        (status = 200, description = "Zip archive stream", content_type = "application/zip"),
        (status = 400, description = "Missing or malformed parameter", body = crate::error::ApiError),
        (status = 500, description = "Archive could not be started", body = crate::error::ApiError)
    )
)]
pub async fn download_range(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DownloadAllQuery>,
) -> Result<Response> {
    let lang = required("lang", query.lang)?;
    let range = ChapterRange::new(
        chapter_bound("start", query.start.as_deref(), None)?,
        chapter_bound("end", query.end.as_deref(), None)?,
    );

    let download = state
        .pipeline
        .range_archive(&MangaId::new(id), &lang, range)
        .await?;
    zip_response(download).await
}

/// Stream an archive as an attachment
///
/// Failures before the first byte become a JSON error response; later ones
/// abort the body mid-transfer.
async fn zip_response(download: ArchiveDownload) -> Result<Response> {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        header_safe(download.file_name())
    );
    let body = download.start().await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(body),
    )
        .into_response())
}

/// Path ids end up in the file name; keep it a valid quoted header value
fn header_safe(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
