//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Minimum level for emitted log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(ConfigError::InvalidLogLevel(other.to_string())),
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable output for local development.
    Pretty,
}

impl LogFormat {
    /// Unknown values fall back to [`LogFormat::Json`].
    pub fn parse(s: &str) -> Self {
        match s {
            "pretty" => Self::Pretty,
            _ => Self::Json,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on (all interfaces).
    pub port: u16,
    /// Path of the libSQL database file.
    pub db_file: PathBuf,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
    /// Upper bound on a single request, storage call included.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            db_file: PathBuf::from("todos.db"),
            log_level: LogLevel::default(),
            log_format: LogFormat::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Build config from environment variables.
    ///
    /// `PORT`, `DB_FILE`, `LOG_LEVEL`, `LOG_FORMAT`, `REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                message: format!("`{raw}`: {e}"),
            })?,
            None => defaults.port,
        };

        let db_file = lookup("DB_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_file);

        let log_level = match lookup("LOG_LEVEL") {
            Some(raw) => LogLevel::parse(&raw)?,
            None => defaults.log_level,
        };

        let log_format = lookup("LOG_FORMAT")
            .map(|raw| LogFormat::parse(&raw))
            .unwrap_or(defaults.log_format);

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .map(Duration::from_secs)
                .map_err(|e| ConfigError::InvalidValue {
                    key: "REQUEST_TIMEOUT_SECS".to_string(),
                    message: format!("`{raw}`: {e}"),
                })?,
            None => defaults.request_timeout,
        };

        Ok(Self {
            port,
            db_file,
            log_level,
            log_format,
            request_timeout,
        })
    }
}
