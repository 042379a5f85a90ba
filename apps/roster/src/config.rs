//! # Configuration
//!
//! Layered settings for the server and CLI.
//!
//! Resolution order (highest priority first):
//! 1. CLI flags (`--database`, `--backend`, `server --host/--port`)
//! 2. Environment variables (`ROSTER_*`)
//! 3. Config file (`--config <path>`, else `roster.toml` when present)
//! 4. Compiled defaults
//!
//! ## Environment Variables
//!
//! - `ROSTER_DATABASE`: database path
//! - `ROSTER_BACKEND`: `redb` or `memory`
//! - `ROSTER_CORS_ORIGINS`: comma-separated origins, or `*` for all
//! - `ROSTER_RATE_LIMIT`: requests per second, `0` disables
//! - `ROSTER_API_KEY`: if set, requires Bearer token authentication
//! - `ROSTER_LOG_FORMAT`: `json` or `text`

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "roster.toml";

/// Default rate limit: 100 requests per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Config parse error in {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Invalid config value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Config validation failed for {field}: {message}")]
    ValidationFailed { field: String, message: String },
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// redb database file (ACID, persistent)
    #[default]
    Redb,
    /// In-memory store, lost on exit
    Memory,
}

impl Backend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Redb => "redb",
            Self::Memory => "memory",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: Backend,
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Redb,
            database: PathBuf::from("roster.db"),
        }
    }
}

/// HTTP hardening knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Allowed CORS origins. Empty means localhost only, `["*"]` means any.
    pub cors_origins: Vec<String>,
    /// Requests per second across all clients; 0 disables limiting.
    pub rate_limit: u32,
    /// Bearer token required on every route except `/health`.
    pub api_key: Option<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            rate_limit: DEFAULT_RATE_LIMIT,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

/// Values given on the command line; `None` leaves lower layers in place.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database: Option<PathBuf>,
    pub backend: Option<Backend>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

// =============================================================================
// LOADING
// =============================================================================

impl RosterConfig {
    /// Resolve the configuration from the process environment.
    pub fn load(config_path: Option<&Path>, cli: &CliOverrides) -> Result<Self, ConfigError> {
        Self::load_with(config_path, cli, |key| std::env::var(key).ok())
    }

    /// Resolve the configuration with an explicit environment lookup.
    pub fn load_with(
        config_path: Option<&Path>,
        cli: &CliOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        // Layer 3: config file
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        // Layer 2: environment variables
        config.apply_env(env)?;

        // Layer 1: CLI flags
        config.apply_cli(cli);

        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML string on top of the compiled defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(val) = env("ROSTER_DATABASE") {
            self.storage.database = PathBuf::from(val);
        }
        if let Some(val) = env("ROSTER_BACKEND") {
            self.storage.backend =
                Backend::from_str(&val, true).map_err(|_| ConfigError::InvalidValue {
                    field: "ROSTER_BACKEND".to_string(),
                    message: format!("expected 'redb' or 'memory', got '{}'", val),
                })?;
        }
        if let Some(val) = env("ROSTER_CORS_ORIGINS") {
            self.security.cors_origins = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(val) = env("ROSTER_RATE_LIMIT") {
            self.security.rate_limit =
                val.trim()
                    .parse::<u32>()
                    .map_err(|e| ConfigError::InvalidValue {
                        field: "ROSTER_RATE_LIMIT".to_string(),
                        message: e.to_string(),
                    })?;
        }
        if let Some(val) = env("ROSTER_API_KEY") {
            self.security.api_key = Some(val);
        }
        if let Some(val) = env("ROSTER_LOG_FORMAT") {
            self.logging.format = match val.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" | "" => LogFormat::Text,
                other => {
                    return Err(ConfigError::InvalidValue {
                        field: "ROSTER_LOG_FORMAT".to_string(),
                        message: format!("expected 'json' or 'text', got '{}'", other),
                    });
                }
            };
        }
        Ok(())
    }

    fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(database) = &cli.database {
            self.storage.database = database.clone();
        }
        if let Some(backend) = cli.backend {
            self.storage.backend = backend;
        }
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
    }

    /// An empty API key disables authentication.
    fn normalize(&mut self) {
        if self.security.api_key.as_deref().is_some_and(str::is_empty) {
            self.security.api_key = None;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::ValidationFailed {
                field: "server.host".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.storage.backend == Backend::Redb && self.storage.database.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed {
                field: "storage.database".to_string(),
                message: "a database path is required for the redb backend".to_string(),
            });
        }
        if self.security.cors_origins.len() > 1
            && self.security.cors_origins.iter().any(|o| o == "*")
        {
            return Err(ConfigError::ValidationFailed {
                field: "security.cors_origins".to_string(),
                message: "'*' cannot be combined with explicit origins".to_string(),
            });
        }
        Ok(())
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// =============================================================================
// TESTS
// =============================================================================
