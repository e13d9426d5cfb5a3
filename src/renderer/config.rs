//! Renderer configuration

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Name of the context whose layouts frame admin renders
pub const DEFAULT_ADMIN_CONTEXT: &str = "admin";

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Configuration for a [`Renderer`](super::Renderer)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    /// Reload every view source before each render
    pub hot_reload: bool,
    /// Context that supplies the layouts for `/admin/<context>` renders
    pub admin_context: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            hot_reload: false,
            admin_context: DEFAULT_ADMIN_CONTEXT.to_string(),
        }
    }
}

impl RendererConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable hot reload
    pub fn with_hot_reload(mut self, hot_reload: bool) -> Self {
        self.hot_reload = hot_reload;
        self
    }

    /// Set the context used for admin chrome
    pub fn with_admin_context(mut self, name: impl Into<String>) -> Self {
        self.admin_context = name.into();
        self
    }

    /// Load a configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse a configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
