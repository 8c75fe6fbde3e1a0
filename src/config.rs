//! Configuration module for feedreader.

use serde::Deserialize;
use std::path::Path;

use crate::{ReaderError, Result};

/// Environment variable that overrides `database.path`.
pub const ENV_DATABASE_PATH: &str = "FEEDREADER_DATABASE_PATH";

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/feedreader.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file. Console output is always enabled.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Feed fetching and refresh configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RssConfig {
    /// Whether the periodic updater runs.
    #[serde(default = "default_rss_enabled")]
    pub enabled: bool,
    /// Interval between full refresh passes in seconds.
    #[serde(default = "default_rss_update_interval")]
    pub update_interval_secs: u64,
    /// Number of feeds refreshed concurrently during a full pass.
    #[serde(default = "default_rss_refresh_concurrency")]
    pub refresh_concurrency: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_rss_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Connection timeout in seconds.
    #[serde(default = "default_rss_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    #[serde(default = "default_rss_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_rss_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_rss_max_redirects")]
    pub max_redirects: usize,
    /// User agent sent with feed requests.
    #[serde(default = "default_rss_user_agent")]
    pub user_agent: String,
    /// Allow feeds hosted on loopback, private or link-local addresses.
    #[serde(default)]
    pub allow_private_hosts: bool,
    /// Maximum number of articles returned by a listing.
    #[serde(default = "default_rss_article_limit")]
    pub article_limit: u32,
}

fn default_rss_enabled() -> bool {
    true
}

fn default_rss_update_interval() -> u64 {
    1800 // 30 minutes
}

fn default_rss_refresh_concurrency() -> usize {
    4
}

fn default_rss_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_rss_connect_timeout() -> u64 {
    10
}

fn default_rss_read_timeout() -> u64 {
    20
}

fn default_rss_total_timeout() -> u64 {
    30
}

fn default_rss_max_redirects() -> usize {
    5
}

fn default_rss_user_agent() -> String {
    format!("feedreader/{} (RSS Reader)", env!("CARGO_PKG_VERSION"))
}

fn default_rss_article_limit() -> u32 {
    100
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            enabled: default_rss_enabled(),
            update_interval_secs: default_rss_update_interval(),
            refresh_concurrency: default_rss_refresh_concurrency(),
            max_feed_size_bytes: default_rss_max_feed_size(),
            connect_timeout_secs: default_rss_connect_timeout(),
            read_timeout_secs: default_rss_read_timeout(),
            total_timeout_secs: default_rss_total_timeout(),
            max_redirects: default_rss_max_redirects(),
            user_agent: default_rss_user_agent(),
            allow_private_hosts: false,
            article_limit: default_rss_article_limit(),
        }
    }
}

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// CORS allowed origins. Empty means any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Maximum accepted size of an import upload in bytes.
    #[serde(default = "default_max_import_size")]
    pub max_import_size_bytes: usize,
}

fn default_max_import_size() -> usize {
    1024 * 1024 // 1MB
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            cors_origins: vec![],
            max_import_size_bytes: default_max_import_size(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Feed fetching and refresh configuration.
    #[serde(default)]
    pub rss: RssConfig,
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ReaderError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ReaderError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FEEDREADER_DATABASE_PATH`: Override the database path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(ENV_DATABASE_PATH) {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.rss.update_interval_secs == 0 {
            return Err(ReaderError::Config(
                "rss.update_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.rss.refresh_concurrency == 0 {
            return Err(ReaderError::Config(
                "rss.refresh_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.rss.article_limit == 0 {
            return Err(ReaderError::Config(
                "rss.article_limit must be greater than 0".to_string(),
            ));
        }
        if self.database.path.trim().is_empty() {
            return Err(ReaderError::Config("database.path is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5001);

        assert_eq!(config.database.path, "data/feedreader.db");

        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());

        assert!(config.rss.enabled);
        assert_eq!(config.rss.update_interval_secs, 1800);
        assert_eq!(config.rss.refresh_concurrency, 4);
        assert_eq!(config.rss.max_feed_size_bytes, 5 * 1024 * 1024);
        assert_eq!(config.rss.connect_timeout_secs, 10);
        assert_eq!(config.rss.read_timeout_secs, 20);
        assert_eq!(config.rss.total_timeout_secs, 30);
        assert_eq!(config.rss.max_redirects, 5);
        assert!(config.rss.user_agent.starts_with("feedreader/"));
        assert!(!config.rss.allow_private_hosts);
        assert_eq!(config.rss.article_limit, 100);

        assert!(config.web.cors_origins.is_empty());
        assert_eq!(config.web.max_import_size_bytes, 1024 * 1024);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 8080

[database]
path = "custom/feeds.sqlite"

[logging]
level = "debug"
file = "logs/feedreader.log"

[rss]
enabled = false
update_interval_secs = 600
refresh_concurrency = 1
max_feed_size_bytes = 1048576
connect_timeout_secs = 5
read_timeout_secs = 15
total_timeout_secs = 25
max_redirects = 2
user_agent = "custom-agent"
allow_private_hosts = true
article_limit = 50

[web]
cors_origins = ["http://localhost:5173"]
max_import_size_bytes = 2048
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, "custom/feeds.sqlite");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.file.as_deref(),
            Some("logs/feedreader.log")
        );

        assert!(!config.rss.enabled);
        assert_eq!(config.rss.update_interval_secs, 600);
        assert_eq!(config.rss.refresh_concurrency, 1);
        assert_eq!(config.rss.max_feed_size_bytes, 1048576);
        assert_eq!(config.rss.connect_timeout_secs, 5);
        assert_eq!(config.rss.read_timeout_secs, 15);
        assert_eq!(config.rss.total_timeout_secs, 25);
        assert_eq!(config.rss.max_redirects, 2);
        assert_eq!(config.rss.user_agent, "custom-agent");
        assert!(config.rss.allow_private_hosts);
        assert_eq!(config.rss.article_limit, 50);

        assert_eq!(config.web.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.web.max_import_size_bytes, 2048);
    }

    #[test]
    fn test_parse_partial_config_uses_defaults() {
        let toml = r#"
[server]
port = 9000
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.rss.update_interval_secs, 1800);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 5001);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("[server\nport = ");
        assert!(matches!(result, Err(ReaderError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/feedreader.toml");
        assert!(matches!(result, Err(ReaderError::Io(_))));
    }

    #[test]
    fn test_validate_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.rss.update_interval_secs = 0;
        assert!(matches!(config.validate(), Err(ReaderError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.rss.refresh_concurrency = 0;
        assert!(matches!(config.validate(), Err(ReaderError::Config(_))));
    }
}
