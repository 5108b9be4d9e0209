//! CLI command implementations.

pub mod attributes;
pub mod check;
pub mod config;
pub mod rules;

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use warden_abac::{Classification, Engine};
use warden_config::{WardenConfig, load_rule_file};

/// Settings shared by every command.
pub struct Context {
    pub config: WardenConfig,
}

impl Context {
    /// Loads configuration for `project` and applies command-line overrides.
    pub fn load(project: &Path, rules: Option<PathBuf>, strict: bool) -> Result<Self> {
        let mut config = WardenConfig::load_from_dir(project)
            .with_context(|| format!("Failed to load configuration from {}", project.display()))?;

        if let Some(rules) = rules {
            config.rules.file = rules;
        }
        if strict {
            config.engine.classification = Classification::FirstSegment;
        }

        Ok(Self { config })
    }

    /// Builds an engine from the configured rule file.
    pub fn engine(&self) -> Result<Engine> {
        let rules = load_rule_file(&self.config.rules.file)?;
        tracing::debug!(
            file = %self.config.rules.file.display(),
            count = rules.len(),
            "loaded rule file"
        );

        let mut engine = Engine::with_options(self.config.engine);
        engine.register_all(rules);
        Ok(engine)
    }
}

/// Parses an optional JSON argument.
pub fn parse_json(flag: &str, raw: Option<&str>) -> Result<Option<serde_json::Value>> {
    raw.map(|text| {
        serde_json::from_str(text).with_context(|| format!("--{flag} is not valid JSON"))
    })
    .transpose()
}
