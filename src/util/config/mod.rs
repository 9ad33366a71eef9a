//! codeloader configuration
//!
//! Loader settings, loadable from a JSON file and overridable from the CLI.
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. Config file (--config loader.json)
//! 3. Default values
//! ```
//!
//! # Usage
//!
//! ```rust
//! use codeloader::util::config::{LoaderConfig, NamespaceScope};
//!
//! let config = LoaderConfig::from_json_str(r#"{ "base_address": "/srv/app/", "sync": true }"#).unwrap();
//! assert!(config.sync);
//! assert_eq!(config.namespace, NamespaceScope::Loader);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::util::logger::LogLevel;

/// Scope of the global namespace units execute in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceScope {
    /// Every loader owns a fresh namespace
    #[default]
    Loader,
    /// The caller supplies a namespace handle that several loaders share
    Shared,
}

/// Loader configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Address that top-level requests are resolved against
    pub base_address: String,
    /// Block on every fetch instead of waiting for completions
    pub sync: bool,
    /// Execution namespace scope
    pub namespace: NamespaceScope,
    /// Log level used by the CLI
    pub log_level: LogLevel,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_address: "/".to_string(),
            sync: false,
            namespace: NamespaceScope::Loader,
            log_level: LogLevel::Info,
        }
    }
}

impl LoaderConfig {
    /// Parse a configuration from JSON text
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::ParseError)
    }

    /// Override the base address
    pub fn with_base_address(
        mut self,
        base_address: impl Into<String>,
    ) -> Self {
        self.base_address = base_address.into();
        self
    }

    /// Override the fetch mode
    pub fn with_sync(
        mut self,
        sync: bool,
    ) -> Self {
        self.sync = sync;
        self
    }

    /// Override the namespace scope
    pub fn with_namespace(
        mut self,
        namespace: NamespaceScope,
    ) -> Self {
        self.namespace = namespace;
        self
    }
}

/// Load a configuration file
pub fn load_config(path: &Path) -> Result<LoaderConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::IoError)?;
    LoaderConfig::from_json_str(&content)
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Config parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
