//! REST API server module
//!
//! Exposes the archival pipeline over HTTP: title search, chapter listing and
//! streamed zip downloads, plus health and OpenAPI endpoints.

use crate::{Config, Pipeline, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Manga
/// - `GET /api/manga/search?title=` - Resolve a title to a manga id
/// - `GET /api/manga/:id/chapters?start=&end=` - Chapters in a number range
/// - `GET /api/manga/:id/download?lang=` - Zip of one chapter (`:id` is a chapter id)
/// - `GET /api/manga/:id/downloadAll?lang=&start=&end=` - Zip of every chapter in range
///
/// ## System
/// - `GET /api/health` - Health check
/// - `GET /api/openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(pipeline: Arc<Pipeline>, config: Arc<Config>) -> Router {
    let state = AppState::new(pipeline, config.clone());

    // The download route takes a chapter id in the slot the others use for a
    // manga id; the router needs one parameter name per position
    let router = Router::new()
        // Manga
        .route("/api/manga/search", get(routes::search_manga))
        .route("/api/manga/:id/chapters", get(routes::list_chapters))
        .route("/api/manga/:id/download", get(routes::download_chapter))
        .route("/api/manga/:id/downloadAll", get(routes::download_range))
        // System
        .route("/api/health", get(routes::health_check))
        .route("/api/openapi.json", get(routes::openapi_spec));

    // Swagger UI serves its own copy of the document so the routes do not overlap
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins are allowed. The API is read-only, so only `GET` is allowed, and
/// `Content-Disposition` is exposed so browser clients can read the archive's
/// file name.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers(Any)
        .expose_headers([header::CONTENT_DISPOSITION]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Start the API server on the configured bind address.
///
/// Runs until the server fails or is aborted. Use
/// [`start_api_server_with_shutdown`] to stop it gracefully.
///
/// # Example
///
/// ```no_run
/// use manga_archiver::{Config, MangaDexClient, Pipeline};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let catalog = Arc::new(MangaDexClient::new(&config.upstream)?);
/// let pipeline = Arc::new(Pipeline::new(catalog, &config));
///
/// // Start API server (blocks until shutdown)
/// manga_archiver::api::start_api_server(pipeline, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(pipeline: Arc<Pipeline>, config: Arc<Config>) -> Result<()> {
    start_api_server_with_shutdown(pipeline, config, std::future::pending()).await
}

/// Start the API server and stop accepting connections once `shutdown` resolves.
///
/// In-flight responses (including archive streams) are allowed to finish.
pub async fn start_api_server_with_shutdown<F>(
    pipeline: Arc<Pipeline>,
    config: Arc<Config>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = config.server.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(pipeline, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    let local_address = listener.local_addr().map_err(crate::error::Error::Io)?;
    tracing::info!(
        address = %local_address,
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
