//! Configuration loading and typed config structures for the server.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults (every field has one)
//! 2. The file named by `FLATS_CONFIG`, default `config/flats.toml`,
//!    skipped when absent. TOML or YAML, chosen by extension.
//! 3. Environment variables prefixed `FLATS__`, with `__` between
//!    sections, e.g. `FLATS__SERVER__PORT=9090`
//! 4. `DATABASE_URL`, overriding `database.url`

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use flats_api::{ApiLimits, ServerConfig};
use flats_db::DatabaseConfig;
use serde::Deserialize;

/// Variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "FLATS_CONFIG";

/// Configuration file used when `FLATS_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/flats.toml";

/// Prefix of environment overrides.
const ENV_PREFIX: &str = "FLATS";

/// Separator between prefix and sections in environment overrides.
const ENV_SEPARATOR: &str = "__";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A source could not be read or the merged result did not deserialize.
    #[error("failed to load configuration: {source}")]
    Load {
        /// The underlying config error.
        source: Box<config::ConfigError>,
    },

    /// The merged configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(source: config::ConfigError) -> Self {
        Self::Load {
            source: Box::new(source),
        }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listen address.
    pub server: ServerConfig,
    /// Storage backend selection.
    pub storage: StorageConfig,
    /// `PostgreSQL` connection settings.
    pub database: DatabaseConfig,
    /// Timeouts and size limits.
    pub limits: LimitsConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from the file, the environment and the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file exists but cannot be
    /// parsed or a value has the wrong type, and [`ConfigError::Invalid`]
    /// if the merged values are inconsistent.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
        let builder = Config::builder()
            .add_source(File::from(Path::new(&path)).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );
        let mut config = Self::from_builder(builder)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string, on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the string is not valid TOML or a
    /// value has the wrong type.
    pub fn parse_toml(toml: &str) -> Result<Self, ConfigError> {
        let config = Self::from_builder(
            Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )?;
        config.validate()?;
        Ok(config)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        Ok(builder.build()?.try_deserialize()?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::Postgres && self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid(String::from(
                "database.url is required for the postgres backend",
            )));
        }
        if self.limits.max_page_size == 0 {
            return Err(ConfigError::Invalid(String::from(
                "limits.max_page_size must be greater than 0",
            )));
        }
        if self.limits.ws_channel_capacity == 0 {
            return Err(ConfigError::Invalid(String::from(
                "limits.ws_channel_capacity must be greater than 0",
            )));
        }
        Ok(())
    }
}

/// Where the catalog lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// `PostgreSQL`, through the pooled repositories.
    #[default]
    Postgres,
    /// In-process maps. Data is lost on exit.
    Memory,
}

/// Storage selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend to use.
    pub backend: StorageBackend,
}

/// Timeouts and size limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Bound on each store call, in milliseconds.
    pub store_timeout_ms: u64,
    /// Bound on each `WebSocket` frame send, in milliseconds.
    pub ws_send_timeout_ms: u64,
    /// Outbound queue length per `WebSocket` connection.
    pub ws_channel_capacity: usize,
    /// Largest accepted page size.
    pub max_page_size: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: 5_000,
            ws_send_timeout_ms: 2_000,
            ws_channel_capacity: 64,
            max_page_size: 100,
        }
    }
}

impl LimitsConfig {
    /// Bound on each store call.
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Limits enforced by the HTTP layer.
    pub const fn api_limits(&self) -> ApiLimits {
        ApiLimits {
            max_page_size: self.max_page_size,
            ws_send_timeout: Duration::from_millis(self.ws_send_timeout_ms),
            ws_channel_capacity: self.ws_channel_capacity,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            json: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MEMORY: &str = "[storage]\nbackend = \"memory\"\n";

    #[test]
    fn defaults_fill_missing_sections() {
        let config = AppConfig::parse_toml(MEMORY).unwrap();
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.limits, LimitsConfig::default());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.database, DatabaseConfig::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let toml = r#"
            [server]
            port = 9090

            [database]
            url = "postgres://flats@localhost/flats"
            max_connections = 4

            [limits]
            store_timeout_ms = 250
            max_page_size = 50

            [logging]
            json = true
        "#;
        let config = AppConfig::parse_toml(toml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.database.max_connections, 4);
        assert!(config.database.run_migrations);
        assert_eq!(config.limits.store_timeout(), Duration::from_millis(250));
        assert_eq!(config.limits.api_limits().max_page_size, 50);
        assert!(config.logging.json);
    }

    #[test]
    fn postgres_requires_url() {
        let err = AppConfig::parse_toml("[server]\nport = 8081\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_page_size_rejected() {
        let toml = format!("{MEMORY}[limits]\nmax_page_size = 0\n");
        assert!(matches!(
            AppConfig::parse_toml(&toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn unknown_backend_rejected() {
        let err = AppConfig::parse_toml("[storage]\nbackend = \"redis\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }
}
