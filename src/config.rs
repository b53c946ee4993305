//! Configuration types for playlist-dl

use crate::error::{Error, Result};
use crate::types::AudioFormat;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Batch loop behaviour (pacing, output location, naming)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchConfig {
    /// Directory saved files are written to (default: "./downloads")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Fixed wait between consecutive task attempts (default: 1000 ms)
    ///
    /// Not applied before the first task of a batch.
    #[serde(default = "default_pacing_delay", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub pacing_delay: Duration,

    /// Format requested when a batch does not name one (default: mp3)
    #[serde(default)]
    pub default_format: AudioFormat,

    /// What to do when the target file already exists (default: rename)
    #[serde(default)]
    pub file_collision: FileCollisionAction,

    /// How long shutdown waits for a running batch (default: 30 seconds)
    #[serde(default = "default_shutdown_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub shutdown_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            pacing_delay: default_pacing_delay(),
            default_format: AudioFormat::default(),
            file_collision: FileCollisionAction::default(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Endpoints of the remote resolver/download service
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FetchConfig {
    /// Base URL of the service (default: "http://localhost:3000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the single-track download endpoint
    #[serde(default = "default_download_path")]
    pub download_path: String,

    /// Path of the playlist resolution endpoint
    #[serde(default = "default_playlist_path")]
    pub playlist_path: String,

    /// Per-request timeout (default: 120 seconds)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            download_path: default_download_path(),
            playlist_path: default_playlist_path(),
            timeout: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    /// Full URL of the download endpoint
    pub fn download_url(&self) -> Result<url::Url> {
        self.join(&self.download_path, "fetch.download_path")
    }

    /// Full URL of the playlist endpoint
    pub fn playlist_url(&self) -> Result<url::Url> {
        self.join(&self.playlist_path, "fetch.playlist_path")
    }

    fn join(&self, path: &str, key: &str) -> Result<url::Url> {
        let base = url::Url::parse(&self.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", self.base_url, e),
            key: Some("fetch.base_url".to_string()),
        })?;
        base.join(path).map_err(|e| Error::Config {
            message: format!("invalid endpoint path '{}': {}", path, e),
            key: Some(key.to_string()),
        })
    }
}

/// Retry configuration for payload fetches
///
/// The default performs a single attempt per task (`max_attempts = 0`).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first one (default: 0)
    #[serde(default)]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Batch history persistence
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Record batches and outcomes in SQLite (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Database path (default: "./playlist-dl.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_path: default_database_path(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// File collision handling
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc. to the file name
    #[default]
    Rename,
    /// Overwrite the existing file
    Overwrite,
    /// Refuse to save (the task fails)
    Skip,
}

/// Main configuration for [`BatchDownloader`](crate::BatchDownloader)
///
/// Every section has documented defaults, so `Config::default()` works out of
/// the box against a resolver service on localhost.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Batch loop behaviour
    #[serde(default)]
    pub batch: BatchConfig,

    /// Remote service endpoints
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Retry policy for fetches
    #[serde(default)]
    pub retry: RetryConfig,

    /// Batch history persistence
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// REST API server
    #[serde(default)]
    pub server: ApiConfig,
}

impl Config {
    /// Check the configuration for values the downloader cannot work with
    pub fn validate(&self) -> Result<()> {
        self.fetch.download_url()?;
        self.fetch.playlist_url()?;

        if self.batch.pacing_delay.is_zero() {
            return Err(Error::Config {
                message: "pacing delay must be greater than zero".to_string(),
                key: Some("batch.pacing_delay".to_string()),
            });
        }

        if self.fetch.timeout.is_zero() {
            return Err(Error::Config {
                message: "fetch timeout must be greater than zero".to_string(),
                key: Some("fetch.timeout".to_string()),
            });
        }

        let multiplier = self.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(Error::Config {
                message: format!(
                    "backoff multiplier must be finite and at least 1.0, got {}",
                    multiplier
                ),
                key: Some("retry.backoff_multiplier".to_string()),
            });
        }

        Ok(())
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_pacing_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_download_path() -> String {
    "/api/download-soundcloud".to_string()
}

fn default_playlist_path() -> String {
    "/api/soundcloud-playlist-downloader".to_string()
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_user_agent() -> String {
    concat!("playlist-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("playlist-dl.db")
}

fn default_true() -> bool {
    true
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper (whole seconds)
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

// Duration serialization helper (milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.batch.pacing_delay, Duration::from_millis(1000));
        assert_eq!(config.retry.max_attempts, 0);
        assert_eq!(config.batch.default_format, AudioFormat::Mp3);
    }

    #[test]
    fn empty_json_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.fetch.base_url, "http://localhost:3000");
        assert_eq!(config.fetch.download_path, "/api/download-soundcloud");
        assert!(config.persistence.enabled);
        assert_eq!(config.batch.file_collision, FileCollisionAction::Rename);
    }

    #[test]
    fn pacing_delay_round_trips_as_milliseconds() {
        let config: Config =
            serde_json::from_str(r#"{"batch": {"pacing_delay": 250}}"#).unwrap();
        assert_eq!(config.batch.pacing_delay, Duration::from_millis(250));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["batch"]["pacing_delay"], 250);
        assert_eq!(json["batch"]["shutdown_timeout"], 30);
    }

    #[test]
    fn zero_pacing_delay_is_rejected() {
        let mut config = Config::default();
        config.batch.pacing_delay = Duration::ZERO;
        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("batch.pacing_delay"))
            }
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn non_finite_backoff_multiplier_is_rejected() {
        for multiplier in [f64::NAN, f64::INFINITY, 0.5] {
            let mut config = Config::default();
            config.retry.backoff_multiplier = multiplier;
            match config.validate() {
                Err(Error::Config { key, .. }) => {
                    assert_eq!(key.as_deref(), Some("retry.backoff_multiplier"))
                }
                other => panic!("expected config error for {}, got {:?}", multiplier, other),
            }
        }
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let mut config = Config::default();
        config.fetch.base_url = "not a url".to_string();
        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("fetch.base_url")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn endpoint_urls_join_base() {
        let mut fetch = FetchConfig::default();
        fetch.base_url = "https://tools.example.com/app/".to_string();
        assert_eq!(
            fetch.download_url().unwrap().as_str(),
            "https://tools.example.com/api/download-soundcloud"
        );
        assert_eq!(
            fetch.playlist_url().unwrap().as_str(),
            "https://tools.example.com/api/soundcloud-playlist-downloader"
        );
    }
}
