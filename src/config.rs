//! Runtime configuration, read from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{DEFAULT_AUDIT_CAPACITY, DEFAULT_INTERNAL_SCHEMES};

/// Quiet period used to coalesce bursts of tab events.
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 300;

/// Identifier the toggler uses for itself when none is configured.
pub const DEFAULT_SELF_ID: &str = "extwake";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identifier of the toggler itself; never disabled.
    pub self_id: String,
    pub quiet_period_ms: u64,
    pub audit_capacity: usize,
    /// Address prefixes ignored when collecting open tabs.
    pub internal_schemes: Vec<String>,
    pub store_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            self_id: DEFAULT_SELF_ID.to_owned(),
            quiet_period_ms: DEFAULT_QUIET_PERIOD_MS,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
            internal_schemes: DEFAULT_INTERNAL_SCHEMES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            store_path: None,
        }
    }
}

impl Config {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on a parse failure or an invalid value.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] on I/O, parse, or validation failure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml_str(&input)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.self_id.trim().is_empty() {
            return Err(ConfigError::Invalid("self_id must not be empty".into()));
        }
        if self.audit_capacity == 0 {
            return Err(ConfigError::Invalid(
                "audit_capacity must be greater than zero".into(),
            ));
        }
        if self.internal_schemes.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::Invalid(
                "internal_schemes must not contain empty prefixes".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}
