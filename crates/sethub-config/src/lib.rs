//! Application settings for the Sethub backend.
//!
//! Configuration is loaded once at process startup from a TOML file with
//! per-field defaults and environment-variable overrides, and is read-only
//! afterwards. The filesystem layout lives in [`ProjectPaths`], resolved
//! once from the configured project root.

mod paths;

pub use paths::{PathsError, ProjectPaths};

use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Application identity and filesystem anchor.
    #[serde(default)]
    pub app: AppConfig,

    /// HTTP server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database connection parameters.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Engine (connection pool) tuning.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Session behavior settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Application identity and filesystem anchor.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Human-readable project name.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Project root directory; the content folders are resolved under it.
    #[serde(default = "default_app_root")]
    pub root: String,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Connection parameters for the database engine.
#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver: "postgres" or "sqlite".
    #[serde(default = "default_db_driver")]
    pub driver: String,

    /// Database server host (postgres only).
    #[serde(default)]
    pub host: Option<String>,

    /// Database server port (postgres only).
    #[serde(default)]
    pub port: Option<u16>,

    /// Login role.
    #[serde(default)]
    pub username: Option<String>,

    /// Login password.
    #[serde(default)]
    pub password: Option<String>,

    /// Database name (postgres) or file path / `:memory:` (sqlite).
    #[serde(default)]
    pub database: Option<String>,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("database", &self.database)
            .finish()
    }
}

/// Engine (connection pool) tuning, passed through to the driver.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connections kept open even when idle.
    #[serde(default)]
    pub min_connections: u32,

    /// How long an acquire may wait before failing, in milliseconds.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    /// Close connections idle for longer than this, in milliseconds.
    #[serde(default)]
    pub idle_timeout_ms: Option<u64>,
}

/// Session behavior settings.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SessionConfig {
    /// Commit work left in a session scope at exit instead of rolling back.
    #[serde(default)]
    pub commit_on_exit: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "sethub_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_app_name() -> String {
    "Sethub".to_string()
}

fn default_app_root() -> String {
    ".".to_string()
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_db_driver() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            root: default_app_root(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: default_db_driver(),
            host: None,
            port: None,
            username: None,
            password: None,
            database: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: 0,
            acquire_timeout_ms: default_acquire_timeout_ms(),
            idle_timeout_ms: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `SETHUB_HOST` overrides `server.host`
/// - `SETHUB_PORT` overrides `server.port`
/// - `SETHUB_DB_DRIVER` overrides `database.driver`
/// - `SETHUB_DB_HOST` overrides `database.host`
/// - `SETHUB_DB_PORT` overrides `database.port`
/// - `SETHUB_DB_USER` overrides `database.username`
/// - `SETHUB_DB_PASSWORD` overrides `database.password`
/// - `SETHUB_DB_NAME` overrides `database.database`
/// - `SETHUB_LOG_LEVEL` overrides `logging.level`
/// - `SETHUB_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("SETHUB_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("SETHUB_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(driver) = std::env::var("SETHUB_DB_DRIVER") {
        config.database.driver = driver;
    }
    if let Ok(host) = std::env::var("SETHUB_DB_HOST") {
        config.database.host = Some(host);
    }
    if let Ok(port) = std::env::var("SETHUB_DB_PORT") {
        if let Ok(parsed) = port.parse() {
            config.database.port = Some(parsed);
        }
    }
    if let Ok(username) = std::env::var("SETHUB_DB_USER") {
        config.database.username = Some(username);
    }
    if let Ok(password) = std::env::var("SETHUB_DB_PASSWORD") {
        config.database.password = Some(password);
    }
    if let Ok(database) = std::env::var("SETHUB_DB_NAME") {
        config.database.database = Some(database);
    }
    if let Ok(level) = std::env::var("SETHUB_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("SETHUB_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_no_path_given() {
        let config = load_config(None).expect("defaults should load");

        assert_eq!(config.app.name, "Sethub");
        assert_eq!(config.database.driver, "postgres");
        assert_eq!(config.engine.max_connections, 10);
        assert_eq!(config.engine.acquire_timeout_ms, 30_000);
        assert!(!config.session.commit_on_exit);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).expect("create config file");
        write!(
            file,
            r#"
            [app]
            name = "Sethub Staging"

            [database]
            driver = "sqlite"
            database = ":memory:"

            [engine]
            max_connections = 3
            acquire_timeout_ms = 1500

            [session]
            commit_on_exit = true

            [logging]
            level = "debug"
            json = true
            "#
        )
        .expect("write config file");

        let config = load_config(Some(path.to_str().expect("utf-8 path"))).expect("load config");

        assert_eq!(config.app.name, "Sethub Staging");
        assert_eq!(config.database.driver, "sqlite");
        assert_eq!(config.database.database.as_deref(), Some(":memory:"));
        assert_eq!(config.engine.max_connections, 3);
        assert_eq!(config.engine.acquire_timeout_ms, 1500);
        assert!(config.session.commit_on_exit);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        // Untouched sections keep their defaults
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("does-not-exist.toml");

        let config = load_config(Some(path.to_str().expect("utf-8 path")))
            .expect("missing file should fall back to defaults");
        assert_eq!(config.database.driver, "postgres");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[database\ndriver = ???").expect("write config file");

        let err = load_config(Some(path.to_str().expect("utf-8 path")))
            .expect_err("malformed toml should fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn password_is_redacted_in_debug_output() {
        let config = DatabaseConfig {
            password: Some("hunter2".to_string()),
            ..DatabaseConfig::default()
        };

        let rendered = format!("{config:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("hunter2"));
    }
}
