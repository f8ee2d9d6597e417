//! Configuration loading and validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::cache::CacheConfig;
use crate::models::Season;
use crate::parse_duration;
use crate::query::DEFAULT_LEADERBOARD_SIZE;
use crate::source::MatchSourceConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Match source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    /// API root of the match source
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout: String,

    /// Bearer token, if the source requires one
    #[serde(default)]
    pub api_token: Option<String>,

    /// Minimum spacing between requests
    #[serde(default = "default_request_delay")]
    pub request_delay: String,
}

fn default_base_url() -> String {
    "http://localhost:9000/api/v1".to_string()
}

fn default_timeout() -> String {
    "30s".to_string()
}

fn default_request_delay() -> String {
    "250ms".to_string()
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            api_token: None,
            request_delay: default_request_delay(),
        }
    }
}

/// Cache lifetime and rebuild pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_ttl")]
    pub ttl: String,

    #[serde(default = "default_refresh_ahead")]
    pub refresh_ahead: String,

    #[serde(default = "default_scan_interval")]
    pub scan_interval: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_batch_delay")]
    pub batch_delay: String,

    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,
}

fn default_ttl() -> String {
    "60m".to_string()
}

fn default_refresh_ahead() -> String {
    "50m".to_string()
}

fn default_scan_interval() -> String {
    "10m".to_string()
}

fn default_batch_size() -> usize {
    5
}

fn default_batch_delay() -> String {
    "1s".to_string()
}

fn default_leaderboard_size() -> usize {
    DEFAULT_LEADERBOARD_SIZE
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            refresh_ahead: default_refresh_ahead(),
            scan_interval: default_scan_interval(),
            batch_size: default_batch_size(),
            batch_delay: default_batch_delay(),
            leaderboard_size: default_leaderboard_size(),
        }
    }
}

/// The current competitive season.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonSettings {
    #[serde(default = "default_season_number")]
    pub number: u32,

    #[serde(default = "default_season_start")]
    pub started_at: DateTime<Utc>,
}

fn default_season_number() -> u32 {
    Season::default().number
}

fn default_season_start() -> DateTime<Utc> {
    Season::default().started_at
}

impl Default for SeasonSettings {
    fn default() -> Self {
        Self {
            number: default_season_number(),
            started_at: default_season_start(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub source: SourceSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub season: SeasonSettings,

    #[serde(default)]
    pub server: ServerConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            source: SourceSettings::default(),
            cache: CacheSettings::default(),
            season: SeasonSettings::default(),
            server: ServerConfig::default(),
        }
    }
}

fn duration(field: &str, value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value).ok_or_else(|| {
        ConfigError::ValidationError(format!("{} is not a valid duration: {:?}", field, value))
    })
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else from `./ladder-stats.toml` when it
    /// exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new("ladder-stats.toml");
                if fallback.exists() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cache = self.cache_config()?;

        if cache.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if cache.ttl.is_zero() {
            return Err(ConfigError::ValidationError(
                "Cache TTL must be greater than 0".to_string(),
            ));
        }

        if cache.refresh_ahead >= cache.ttl {
            return Err(ConfigError::ValidationError(
                "Refresh-ahead threshold must be shorter than the TTL".to_string(),
            ));
        }

        if cache.scan_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "Scan interval must be greater than 0".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        self.source_config()?;
        Ok(())
    }

    pub fn cache_config(&self) -> Result<CacheConfig, ConfigError> {
        Ok(CacheConfig {
            ttl: duration("cache.ttl", &self.cache.ttl)?,
            refresh_ahead: duration("cache.refresh_ahead", &self.cache.refresh_ahead)?,
            scan_interval: duration("cache.scan_interval", &self.cache.scan_interval)?,
            batch_size: self.cache.batch_size,
            batch_delay: duration("cache.batch_delay", &self.cache.batch_delay)?,
            leaderboard_size: self.cache.leaderboard_size,
        })
    }

    pub fn source_config(&self) -> Result<MatchSourceConfig, ConfigError> {
        let base_url = Url::parse(&self.source.base_url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "Invalid source base URL {:?}: {}",
                self.source.base_url, e
            ))
        })?;

        let mut config = MatchSourceConfig::new(base_url);
        config.timeout = duration("source.timeout", &self.source.timeout)?;
        config.request_delay = duration("source.request_delay", &self.source.request_delay)?;
        config.api_token = self.source.api_token.clone();
        Ok(config)
    }

    pub fn season(&self) -> Season {
        Season::new(self.season.number, self.season.started_at)
    }
}
