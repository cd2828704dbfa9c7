//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`manga`]: Title search, chapter listing and archive downloads
//! - [`system`]: Health and OpenAPI

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

mod manga;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use manga::*;
pub use system::*;

// ============================================================================
// Query/Response Types (shared across handlers)
// ============================================================================
//
// Every query field is taken as a raw string so that missing or malformed
// values produce our JSON validation error instead of axum's plain-text
// rejection.

/// Query parameters for GET /manga/search
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Title to look up (required)
    pub title: Option<String>,
}

/// Response body for GET /manga/search
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SearchResponse {
    /// Identifier of the first matching manga
    pub id: crate::types::MangaId,
}

/// Query parameters for GET /manga/:id/chapters
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChaptersQuery {
    /// Lowest chapter number, inclusive (default: 0)
    pub start: Option<String>,
    /// Highest chapter number, inclusive (default: 10)
    pub end: Option<String>,
}

/// Query parameters for GET /manga/:id/download
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    /// Language code of the chapter (required)
    pub lang: Option<String>,
}

/// Query parameters for GET /manga/:id/downloadAll
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadAllQuery {
    /// Language code of the chapters (required)
    pub lang: Option<String>,
    /// Lowest chapter number, inclusive (required)
    pub start: Option<String>,
    /// Highest chapter number, inclusive (required)
    pub end: Option<String>,
}

/// A required, non-blank query parameter
fn required(name: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(Error::Validation(format!(
            "missing required query parameter \"{}\"",
            name
        ))),
    }
}

/// A finite chapter-number bound; `default` applies only when the parameter is absent
fn chapter_bound(name: &str, value: Option<&str>, default: Option<f64>) -> Result<f64> {
    let Some(raw) = value else {
        return default.ok_or_else(|| {
            Error::Validation(format!("missing required query parameter \"{}\"", name))
        });
    };

    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| Error::Validation(format!("\"{}\" must be a number, got {:?}", name, raw)))
}
