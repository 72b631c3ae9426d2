//! Configuration types for the X11 client.

use crate::errors::X11ClientError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use x11_protocol::DisplaySpec;

/// Complete X11 client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Connection settings.
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Security settings.
    #[serde(default)]
    pub security: SecurityConfig,
}

/// Connection configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Display string to connect to. When unset, the environment is consulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Security configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Try an unauthenticated connection when no credential can be found.
    ///
    /// When `false`, a failed authority lookup aborts the connection attempt.
    #[serde(default = "default_true")]
    pub allow_unauthenticated: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allow_unauthenticated: default_true(),
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml_str(text: &str) -> Result<Self, X11ClientError> {
        let config: Self =
            toml::from_str(text).map_err(|e| X11ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file (TOML).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, X11ClientError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            X11ClientError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Validates the configuration.
    ///
    /// A configured display string must parse; an empty one is treated as
    /// "not configured" and left for the environment to supply.
    pub fn validate(&self) -> Result<(), X11ClientError> {
        if let Some(display) = self.connection.display.as_deref() {
            if !display.is_empty() {
                DisplaySpec::parse(display).map_err(|e| {
                    X11ClientError::Config(format!("invalid display: {}", e))
                })?;
            }
        }
        Ok(())
    }
}

/// Builder for creating a `Config`.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the display string.
    #[must_use]
    pub fn display(mut self, display: impl Into<String>) -> Self {
        self.config.connection.display = Some(display.into());
        self
    }

    /// Allows or forbids falling back to an unauthenticated connection.
    #[must_use]
    pub fn allow_unauthenticated(mut self, allow: bool) -> Self {
        self.config.security.allow_unauthenticated = allow;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<Config, X11ClientError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
