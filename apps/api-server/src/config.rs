//! Centralized configuration for api-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time.

use axum::http::HeaderValue;
use std::env;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_RATE_LIMIT_RPS: NonZeroU32 = match NonZeroU32::new(200) {
    Some(n) => n,
    None => panic!("default rate limit must be non-zero"),
};

/// Storage backend provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// In-memory storage (data lost on restart)
    Memory,
    /// SQLite file-based storage
    Sqlite,
}

impl StorageProvider {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("sqlite") {
            Self::Sqlite
        } else {
            Self::Memory
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug, Error)]
#[error("Configuration error for {field}: {message}")]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields are validated at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 8080)
    pub port: u16,
    /// Storage provider (default: sqlite)
    pub storage_provider: StorageProvider,
    /// SQLite database path (default: sqlite.db)
    pub db_path: PathBuf,
    /// Delete the SQLite file before opening it (default: true)
    pub db_reset_on_start: bool,
    /// Write the sample notes at startup (default: true)
    pub seed_sample_notes: bool,
    /// Log format
    pub log_format: LogFormat,
    /// CORS allow origin
    pub cors_allow_origin: HeaderValue,
    /// Per-request timeout (default: 15s)
    pub request_timeout: Duration,
    /// Requests per second allowed across all clients (default: 200)
    pub rate_limit_rps: NonZeroU32,
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// Fails fast on invalid configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Port
        let port = match lookup("PORT") {
            Some(s) => s.trim().parse::<u16>().map_err(|e| ConfigError {
                field: "PORT",
                message: format!("Invalid port '{}': {}", s, e),
            })?,
            None => 8080,
        };

        // Storage provider
        let storage_provider = StorageProvider::from_str(
            &lookup("STORAGE_PROVIDER").unwrap_or_else(|| "sqlite".into()),
        );

        // DB path and startup policy (for sqlite)
        let db_path = lookup("DB_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("sqlite.db"));
        let db_reset_on_start = parse_flag(&lookup, "DB_RESET_ON_START", true)?;
        let seed_sample_notes = parse_flag(&lookup, "SEED_SAMPLE_NOTES", true)?;

        // Log format
        let log_format =
            LogFormat::from_str(&lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".into()));

        // CORS allow origin
        let cors_origin_str = lookup("CORS_ALLOW_ORIGIN").unwrap_or_else(|| "*".into());
        let cors_allow_origin = if cors_origin_str == "*" {
            HeaderValue::from_static("*")
        } else {
            HeaderValue::from_str(&cors_origin_str).map_err(|e| ConfigError {
                field: "CORS_ALLOW_ORIGIN",
                message: format!("Invalid header value '{}': {}", cors_origin_str, e),
            })?
        };

        // Request timeout
        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(s) => match s.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError {
                        field: "REQUEST_TIMEOUT_SECS",
                        message: format!("Expected a positive number of seconds, got '{}'", s),
                    })
                }
            },
            None => Duration::from_secs(15),
        };

        // Global rate limit
        let rate_limit_rps = match lookup("RATE_LIMIT_RPS") {
            Some(s) => s
                .trim()
                .parse::<NonZeroU32>()
                .map_err(|e| ConfigError {
                    field: "RATE_LIMIT_RPS",
                    message: format!("Expected a positive request count, got '{}': {}", s, e),
                })?,
            None => DEFAULT_RATE_LIMIT_RPS,
        };

        Ok(Self {
            port,
            storage_provider,
            db_path,
            db_reset_on_start,
            seed_sample_notes,
            log_format,
            cors_allow_origin,
            request_timeout,
            rate_limit_rps,
        })
    }

    /// Log warnings about configurations that lose data.
    pub fn warn_if_ephemeral(&self) {
        match self.storage_provider {
            StorageProvider::Memory => {
                tracing::warn!("STORAGE_PROVIDER=memory: notes are lost when the server stops.");
            }
            StorageProvider::Sqlite if self.db_reset_on_start => {
                tracing::warn!(
                    path = %self.db_path.display(),
                    "DB_RESET_ON_START is set: the database file is deleted on every start. \
                     Set DB_RESET_ON_START=false to keep notes across restarts."
                );
            }
            StorageProvider::Sqlite => {}
        }
    }
}

fn parse_flag<F>(lookup: &F, field: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(field) else {
        return Ok(default);
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError {
            field,
            message: format!("Expected true/false, got '{}'", raw),
        }),
    }
}
