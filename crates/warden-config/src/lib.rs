//! Configuration management for Warden
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. CLI arguments (highest precedence, applied by the caller)
//! 2. Environment variables (WARDEN_* prefix)
//! 3. warden.local.toml (gitignored, local overrides)
//! 4. warden.toml (git-tracked, project config)
//! 5. ~/.config/warden/config.toml (user defaults)
//! 6. Built-in defaults (lowest precedence)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use warden_abac::EngineOptions;

mod error;
mod loader;
mod paths;
mod rules;

pub use error::ConfigError;
pub use loader::{ConfigLayer, ConfigLoader};
pub use paths::{LOCAL_CONFIG_FILE, PROJECT_CONFIG_FILE, Paths};
pub use rules::load_rule_file;

/// Main Warden configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub engine: EngineOptions,
    pub rules: RulesConfig,
}

/// Where rule schemas are read from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// JSON file mapping rule names to rule schemas.
    pub file: PathBuf,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("rules.json"),
        }
    }
}

impl WardenConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        if self.rules.file.is_relative() {
            self.rules.file = base.join(&self.rules.file);
        }
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }
}
