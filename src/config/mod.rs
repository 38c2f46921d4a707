//! Service configuration.
//!
//! Loaded from a TOML file; every section and field has a default, so an
//! absent file yields a working development setup. A few values can be
//! overridden from the environment:
//!
//! | Variable              | Overrides          |
//! |-----------------------|--------------------|
//! | `PROEPHEM_ADDRESS`    | `server.address`   |
//! | `PROEPHEM_LOG_LEVEL`  | `logging.level`    |
//! | `SWISS_EPHEMERIS_PATH`| `ephemeris.path`   |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::ephemeris::swiss::DEFAULT_EPHE_PATH;
use crate::security::rate_limit::DEFAULT_MAX_REQUESTS_PER_DAY;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub ephemeris: EphemerisConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".into(),
        }
    }
}

/// Bearer tokens accepted by the static authenticator, mapped to user ids.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub tokens: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests_per_day: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_day: DEFAULT_MAX_REQUESTS_PER_DAY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EphemerisConfig {
    /// Directory holding the Swiss Ephemeris `.se1` data files.
    pub path: PathBuf,
}

impl Default for EphemerisConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_EPHE_PATH),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Seconds between sweeps of expired documents.
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// `pretty` or `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl Config {
    /// Loads configuration from `path` and applies environment overrides.
    ///
    /// No path, or a path that does not exist, yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or the
    /// result is inconsistent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => match std::fs::read_to_string(path) {
                Ok(text) => Self::from_toml_str(&text)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(path = %path.display(), "config file not found, using defaults");
                    Self::default()
                }
                Err(source) => {
                    return Err(ConfigError::Read {
                        path: path.to_owned(),
                        source,
                    });
                }
            },
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies overrides looked up by variable name.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(address) = lookup("PROEPHEM_ADDRESS") {
            self.server.address = address;
        }
        if let Some(level) = lookup("PROEPHEM_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(path) = lookup("SWISS_EPHEMERIS_PATH") {
            self.ephemeris.path = PathBuf::from(path);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.max_requests_per_day == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.max_requests_per_day must be at least 1".into(),
            ));
        }
        if self.store.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "store.sweep_interval_secs must be at least 1".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::Invalid(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }
        Ok(())
    }
}
