//! Configuration types for media-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Top-level configuration
///
/// Every section has sensible defaults; `Config::default()` yields a working
/// setup that stores artifacts under `./temp` and serves the API on
/// `127.0.0.1:3001`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Transient store and job timing settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// External fetch tool settings
    #[serde(default)]
    pub tool: ToolConfig,

    /// Authentication material passed opaquely to the fetch tool
    #[serde(default)]
    pub auth: AuthConfig,

    /// API server settings
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Validate cross-field constraints that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self.download.retention.is_zero() {
            return Err(Error::Config {
                message: "retention must be non-zero, every store entry would be swept instantly"
                    .to_string(),
                key: Some("download.retention_secs".to_string()),
            });
        }
        if self.download.sweep_interval.is_zero() {
            return Err(Error::Config {
                message: "sweep interval must be non-zero".to_string(),
                key: Some("download.sweep_interval_secs".to_string()),
            });
        }
        Ok(())
    }
}

/// Transient store and job timing configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Directory for in-flight and completed artifacts (default: "./temp")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// How long store entries are kept before the sweep reclaims them,
    /// in seconds (default: 3600)
    #[serde(
        default = "default_retention",
        rename = "retention_secs",
        with = "duration_secs"
    )]
    #[schema(value_type = u64)]
    pub retention: Duration,

    /// How often the age-based sweep runs, in seconds (default: 1800)
    #[serde(
        default = "default_sweep_interval",
        rename = "sweep_interval_secs",
        with = "duration_secs"
    )]
    #[schema(value_type = u64)]
    pub sweep_interval: Duration,

    /// Pause between process exit and the store scan, in milliseconds,
    /// absorbing filesystem write-completion latency (default: 500)
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl DownloadConfig {
    /// The settling delay as a [`Duration`]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            retention: default_retention(),
            sweep_interval: default_sweep_interval(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

/// External fetch tool configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolConfig {
    /// Path to the yt-dlp executable (auto-detected from PATH if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Extractor retry count passed to the tool during metadata resolution
    /// (default: 3)
    #[serde(default = "default_extractor_retries")]
    pub extractor_retries: u32,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            extractor_retries: default_extractor_retries(),
        }
    }
}

/// Authentication configuration
///
/// The cookie file is passed to the fetch tool as-is; this crate never reads
/// or interprets it.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthConfig {
    /// Netscape-format cookie file handed to the tool for gated platforms
    #[serde(default)]
    pub cookies_file: Option<PathBuf>,

    /// Platforms that get the cookie file applied
    /// (default: ["instagram", "tiktok"])
    #[serde(default = "default_auth_platforms")]
    pub platforms: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookies_file: None,
            platforms: default_auth_platforms(),
        }
    }
}

/// Server configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerConfig {
    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Bind address (default: 127.0.0.1:3001)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Whether CORS headers are emitted (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins; "*" allows any (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Whether the interactive Swagger UI is served at /swagger-ui
    /// (default: false)
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

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_retention() -> Duration {
    Duration::from_secs(3600)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(1800)
}

fn default_settle_delay_ms() -> u64 {
    500
}

fn default_extractor_retries() -> u32 {
    3
}

fn default_auth_platforms() -> Vec<String> {
    vec!["instagram".to_string(), "tiktok".to_string()]
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3001))
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

/// Serialize/deserialize `Duration` as whole seconds
mod duration_secs {
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
