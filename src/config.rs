//! TOML-based service configuration.

use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cycle::types::CycleConfig;

/// Top-level service configuration parsed from TOML.
///
/// Every section has defaults, so an empty file is a valid configuration.
/// Load with [`ServiceConfig::from_toml_file`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Listener for sensor, actuator, and HTTP clients.
    #[serde(default)]
    pub server: ServerConfig,
    /// Cycle timing.
    #[serde(default)]
    pub cycle: CycleSection,
    /// Record log location.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Log filtering.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `"0.0.0.0:8000"`.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CycleSection {
    /// Seconds between cycle boundaries (must be > 0).
    pub period_secs: f64,
}

impl Default for CycleSection {
    fn default() -> Self {
        Self { period_secs: 3.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersistenceConfig {
    /// CSV record log; created on first write.
    pub path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/site_records.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"cycle.period_secs"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl ServiceConfig {
    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.bind.parse::<SocketAddr>().is_err() {
            errors.push(ConfigError {
                field: "server.bind".into(),
                message: format!("\"{}\" is not a socket address", self.server.bind),
            });
        }

        let period_ok = Duration::try_from_secs_f64(self.cycle.period_secs)
            .is_ok_and(|d| !d.is_zero());
        if !period_ok {
            errors.push(ConfigError {
                field: "cycle.period_secs".into(),
                message: "must be a positive number of seconds".into(),
            });
        }

        if self.persistence.path.as_os_str().is_empty() {
            errors.push(ConfigError {
                field: "persistence.path".into(),
                message: "must not be empty".into(),
            });
        }

        if self.logging.filter.trim().is_empty() {
            errors.push(ConfigError {
                field: "logging.filter".into(),
                message: "must not be empty".into(),
            });
        }

        errors
    }

    /// Parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `server.bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.bind.parse().map_err(|_| ConfigError {
            field: "server.bind".into(),
            message: format!("\"{}\" is not a socket address", self.server.bind),
        })
    }

    /// Cycle timing derived from `cycle.period_secs`.
    ///
    /// # Panics
    ///
    /// Panics if the period is not a positive finite number; call
    /// [`validate`](Self::validate) first.
    pub fn cycle_config(&self) -> CycleConfig {
        CycleConfig::new(Duration::from_secs_f64(self.cycle.period_secs))
    }
}
