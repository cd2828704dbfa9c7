//! Configuration types for manga-archiver

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, time::Duration};
use utoipa::ToSchema;

/// Main configuration
///
/// Every field has a default, so an empty JSON object (`{}`) is a valid
/// configuration that talks to the public MangaDex API and listens on
/// `127.0.0.1:3001`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Upstream catalog settings
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Archive composition settings
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Orchestration settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// API server settings
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Load a configuration from a JSON file and validate it
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;

        let config: Config = serde_json::from_str(&content).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        fn invalid(key: &str, message: &str) -> Error {
            Error::Config {
                message: message.to_string(),
                key: Some(key.to_string()),
            }
        }

        if url::Url::parse(&self.upstream.base_url).is_err() {
            return Err(invalid("upstream.base_url", "must be an absolute URL"));
        }
        if self.upstream.timeout.is_zero() {
            return Err(invalid("upstream.timeout", "must be at least 1 second"));
        }
        if self.upstream.chapter_page_limit == 0 || self.upstream.chapter_page_limit > 500 {
            return Err(invalid(
                "upstream.chapter_page_limit",
                "must be between 1 and 500",
            ));
        }
        if self.upstream.max_chapter_pages == 0 {
            return Err(invalid("upstream.max_chapter_pages", "must be at least 1"));
        }
        if self.archive.compression_level > 9 {
            return Err(invalid(
                "archive.compression_level",
                "must be between 0 and 9",
            ));
        }
        if self.archive.prefetch_concurrency == 0 {
            return Err(invalid(
                "archive.prefetch_concurrency",
                "must be at least 1",
            ));
        }
        if self.archive.channel_capacity == 0 {
            return Err(invalid("archive.channel_capacity", "must be at least 1"));
        }
        if self.pipeline.metadata_languages.is_empty() {
            return Err(invalid(
                "pipeline.metadata_languages",
                "must list at least one language",
            ));
        }
        Ok(())
    }
}

/// Upstream catalog/content service configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UpstreamConfig {
    /// Base URL of the catalog API (default: "https://api.mangadex.org")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-call timeout in seconds (default: 30)
    #[serde(default = "default_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub timeout: Duration,

    /// User-Agent header sent with every upstream request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Chapters requested per listing call (default: 100)
    #[serde(default = "default_chapter_page_limit")]
    pub chapter_page_limit: u32,

    /// Follow `offset` pagination past the first listing page (default: false)
    ///
    /// When disabled, chapter listings are capped at one page of
    /// `chapter_page_limit` entries.
    #[serde(default)]
    pub follow_pagination: bool,

    /// Upper bound on listing pages fetched when following pagination (default: 10)
    #[serde(default = "default_max_chapter_pages")]
    pub max_chapter_pages: u32,

    /// Use the compressed "data-saver" image set instead of originals (default: false)
    #[serde(default)]
    pub data_saver: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            chapter_page_limit: default_chapter_page_limit(),
            follow_pagination: false,
            max_chapter_pages: default_max_chapter_pages(),
            data_saver: false,
        }
    }
}

/// What to do when a page (or a chapter's page list) cannot be fetched mid-archive
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failure; the archive is left unfinalized
    #[default]
    AbortAll,
    /// Skip failed pages and record them in a `failed-pages.json` manifest entry
    SkipAndContinue,
}

/// Archive composition configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ArchiveConfig {
    /// Deflate level 0-9 (default: 9)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Page fetches in flight per chapter (default: 4, 1 = strictly sequential)
    #[serde(default = "default_prefetch_concurrency")]
    pub prefetch_concurrency: usize,

    /// Chunks buffered between the archive writer and the HTTP body (default: 8)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Partial failure handling (default: abort_all)
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
            prefetch_concurrency: default_prefetch_concurrency(),
            channel_capacity: default_channel_capacity(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Orchestration configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PipelineConfig {
    /// Languages accepted by the read-only chapter listing (default: ["es", "en"])
    #[serde(default = "default_metadata_languages")]
    pub metadata_languages: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            metadata_languages: default_metadata_languages(),
        }
    }
}

/// API and external server integration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind the API server (default: 127.0.0.1:3001)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins; "*" allows any (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Serve Swagger UI at /swagger-ui (default: false)
    #[serde(default)]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: false,
        }
    }
}

fn default_base_url() -> String {
    "https://api.mangadex.org".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("manga-archiver/{}", env!("CARGO_PKG_VERSION"))
}

fn default_chapter_page_limit() -> u32 {
    100
}

fn default_max_chapter_pages() -> u32 {
    10
}

fn default_compression_level() -> u32 {
    9
}

fn default_prefetch_concurrency() -> usize {
    4
}

fn default_channel_capacity() -> usize {
    8
}

fn default_metadata_languages() -> Vec<String> {
    vec!["es".into(), "en".into()]
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3001))
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
