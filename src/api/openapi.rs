//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the manga-archiver REST
//! API using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the manga-archiver REST API
///
/// The spec can be accessed via:
/// - `/api/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (if enabled)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "manga-archiver REST API",
        version = "0.1.0",
        description = "Resolve manga titles, list chapters by number range and stream chapters as zip archives",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3001", description = "Local development server")
    ),
    paths(
        // Manga
        crate::api::routes::search_manga,
        crate::api::routes::list_chapters,
        crate::api::routes::download_chapter,
        crate::api::routes::download_range,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::MangaId,
        crate::types::ChapterId,
        crate::types::Manga,
        crate::types::Chapter,
        crate::types::Page,
        crate::types::ChapterRange,

        // API response types from routes
        crate::api::routes::SearchResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "manga", description = "Title search, chapter listing and zip archive downloads"),
        (name = "system", description = "System endpoints - Health check and OpenAPI spec"),
    )
)]
pub struct ApiDoc;
