//! # manga-archiver
//!
//! Streams manga chapters from a MangaDex-compatible catalog into zip archives.
//!
//! ## Pipeline
//!
//! A request flows through four stages:
//! - **Catalog** ([`catalog`]) - title search, chapter listings, page
//!   descriptors and page bytes from the upstream API
//! - **Range filter** ([`filter`]) - keep chapters whose number lies in an
//!   inclusive range
//! - **Page resolution** ([`pages`]) - chapter id to ordered page list
//! - **Archive streaming** ([`archive`]) - pages written into a zip that is
//!   sent to the client while it is being built
//!
//! [`Pipeline`] composes the stages per request and [`api`] exposes them over
//! HTTP.
//!
//! ## Quick Start
//!
//! ```no_run
//! use manga_archiver::{ChapterRange, Config, MangaDexClient, Pipeline};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let catalog = Arc::new(MangaDexClient::new(&config.upstream)?);
//!     let pipeline = Pipeline::new(catalog, &config);
//!
//!     let manga_id = pipeline.search("Berserk").await?;
//!     let download = pipeline
//!         .range_archive(&manga_id, "en", ChapterRange::new(1.0, 3.0))
//!         .await?;
//!
//!     let file_name = download.file_name().to_string();
//!     std::fs::write(file_name, download.into_bytes().await?)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Streaming zip composition
pub mod archive;
/// Upstream catalog access
pub mod catalog;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Chapter range filtering
pub mod filter;
/// Page resolution
pub mod pages;
/// Per-request orchestration
pub mod pipeline;
/// Core types
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use archive::{ArchiveStreamer, ArchiveUnit};
pub use catalog::{CatalogSource, MangaDexClient};
pub use config::{Config, FailurePolicy};
pub use error::{
    ApiError, ArchiveError, Error, ErrorDetail, PageResolutionError, Result, ToHttpStatus,
    UpstreamError,
};
pub use pages::PageResolver;
pub use pipeline::{ArchiveDownload, Pipeline};
pub use types::{Chapter, ChapterId, ChapterRange, Manga, MangaId, Page};

use std::sync::Arc;

/// Run the API server until a termination signal arrives.
///
/// Builds the catalog client and pipeline from `config`, then serves until
/// SIGTERM/SIGINT (Ctrl+C elsewhere). In-flight archive streams are allowed to
/// finish before this returns.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use manga_archiver::{Config, run_server_until_signal};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     run_server_until_signal(Config::default()).await?;
///     Ok(())
/// }
/// ```
pub async fn run_server_until_signal(config: Config) -> Result<()> {
    config.validate()?;

    let config = Arc::new(config);
    let catalog = Arc::new(MangaDexClient::new(&config.upstream)?);
    let pipeline = Arc::new(Pipeline::new(catalog, &config));

    api::start_api_server_with_shutdown(pipeline, config, wait_for_signal()).await
}

/// Resolves on SIGTERM or SIGINT, whichever arrives first
///
/// A signal whose handler cannot be registered (restricted containers, some
/// test harnesses) is simply not waited on; if neither registers, Ctrl+C is
/// used instead.
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    fn register(kind: SignalKind, name: &str) -> Option<Signal> {
        signal(kind)
            .map_err(|e| tracing::warn!(signal = name, error = %e, "could not register signal handler"))
            .ok()
    }

    async fn received(signal: Option<Signal>) {
        match signal {
            Some(mut signal) => {
                signal.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    let sigterm = register(SignalKind::terminate(), "SIGTERM");
    let sigint = register(SignalKind::interrupt(), "SIGINT");

    let name = if sigterm.is_none() && sigint.is_none() {
        tracing::error!("no signal handlers registered, falling back to ctrl_c");
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl_c");
        }
        "ctrl_c"
    } else {
        tokio::select! {
            _ = received(sigterm) => "SIGTERM",
            _ = received(sigint) => "SIGINT",
        }
    };

    tracing::info!(signal = name, "shutting down, letting in-flight archive streams finish");
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl_c");
        return;
    }
    tracing::info!(signal = "ctrl_c", "shutting down, letting in-flight archive streams finish");
}
