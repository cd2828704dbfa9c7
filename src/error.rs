//! Error types for manga-archiver
//!
//! This module provides error handling for the archival pipeline, including:
//! - Domain-specific error types (Upstream, PageResolution, Archive)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for manga-archiver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for manga-archiver
///
/// Every core operation returns this type. The variants follow the pipeline's
/// taxonomy: caller mistakes (`Validation`), empty lookups (`NotFound`), failures
/// talking to the catalog (`Upstream`, `PageResolution`) and failures while the
/// archive is being composed (`Archive`).
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed request parameter
    #[error("validation error: {0}")]
    Validation(String),

    /// Lookup produced no result (e.g. a title search with zero matches)
    #[error("{0} not found")]
    NotFound(String),

    /// The catalog source failed (transport, non-2xx status, timeout or bad payload)
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Page metadata for a chapter could not be resolved
    #[error(transparent)]
    PageResolution(#[from] PageResolutionError),

    /// Composing or transmitting the archive failed
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "archive.prefetch_concurrency")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Failures reported by the upstream catalog/content service
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// Connection, TLS or body transfer failure
    #[error("request to {url} failed: {reason}")]
    Transport {
        /// The URL that was requested
        url: String,
        /// The underlying HTTP client error, rendered
        reason: String,
    },

    /// The per-call timeout expired
    #[error("request to {url} timed out")]
    Timeout {
        /// The URL that was requested
        url: String,
    },

    /// The upstream answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// The URL that was requested
        url: String,
        /// The HTTP status code returned
        status: u16,
    },

    /// The response body could not be decoded
    #[error("unexpected response from {url}: {reason}")]
    Parse {
        /// The URL that was requested
        url: String,
        /// Why decoding failed
        reason: String,
    },
}

impl UpstreamError {
    /// Classify a reqwest error for the given URL
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            UpstreamError::Timeout { url }
        } else if source.is_decode() {
            UpstreamError::Parse {
                url,
                reason: source.to_string(),
            }
        } else if let Some(status) = source.status() {
            UpstreamError::Status {
                url,
                status: status.as_u16(),
            }
        } else {
            UpstreamError::Transport {
                url,
                reason: source.to_string(),
            }
        }
    }
}

/// Page metadata for one chapter could not be fetched
#[derive(Debug, Clone, Error)]
#[error("failed to resolve pages for chapter {chapter_id}: {source}")]
pub struct PageResolutionError {
    /// The chapter whose page list was requested
    pub chapter_id: String,
    /// The underlying upstream failure
    #[source]
    pub source: UpstreamError,
}

/// Failures while composing the archive
#[derive(Debug, Clone, Error)]
pub enum ArchiveError {
    /// A page image could not be fetched
    #[error("failed to fetch page {path}: {source}")]
    PageFetch {
        /// Archive path the page would have been written to
        path: String,
        /// The underlying upstream failure
        #[source]
        source: UpstreamError,
    },

    /// A chapter's page list could not be resolved mid-stream
    #[error(transparent)]
    PageResolution(#[from] PageResolutionError),

    /// The zip writer rejected an operation
    #[error("zip writer error: {0}")]
    Zip(String),

    /// The receiving side went away (client disconnected)
    #[error("archive stream cancelled: receiver closed")]
    Cancelled,
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(e: zip::result::ZipError) -> Self {
        ArchiveError::Zip(e.to_string())
    }
}

impl From<std::io::Error> for ArchiveError {
    fn from(e: std::io::Error) -> Self {
        ArchiveError::Zip(e.to_string())
    }
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "manga titled \"Unknown\" not found"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::NotFound(_) => 404,

            // Upstream and archive failures all surface as 500
            Error::Upstream(_) => 500,
            Error::PageResolution(_) => 500,
            Error::Archive(_) => 500,

            Error::Config { .. } => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::NotFound(_) => "not_found",
            Error::Upstream(e) => match e {
                UpstreamError::Timeout { .. } => "upstream_timeout",
                _ => "upstream_error",
            },
            Error::PageResolution(_) => "page_resolution_error",
            Error::Archive(ArchiveError::Cancelled) => "archive_cancelled",
            Error::Archive(_) => "archive_error",
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Upstream(UpstreamError::Status { url, status }) => Some(serde_json::json!({
                "url": url,
                "upstream_status": status,
            })),
            Error::PageResolution(PageResolutionError { chapter_id, .. })
            | Error::Archive(ArchiveError::PageResolution(PageResolutionError {
                chapter_id, ..
            })) => Some(serde_json::json!({
                "chapter_id": chapter_id,
            })),
            Error::Archive(ArchiveError::PageFetch { path, .. }) => Some(serde_json::json!({
                "path": path,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
