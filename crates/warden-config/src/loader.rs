//! Layered configuration loading

use crate::{Paths, WardenConfig};
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};

/// A configuration file layer. Later layers override earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// `config.toml` in the per-user config directory.
    User,
    /// `warden.toml` in the project directory.
    Project,
    /// `warden.local.toml` in the project directory.
    Local,
}

/// Merges built-in defaults, the config file layers, then `<PREFIX>_*`
/// environment variables.
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    user_paths: Option<Paths>,
}

impl ConfigLoader {
    /// Loader for the current directory with XDG user config and the
    /// `WARDEN` environment prefix.
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "WARDEN".to_string(),
            user_paths: Some(Paths::new()),
        }
    }

    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Reads the user layer from `dir` instead of the XDG config directory.
    pub fn with_user_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_paths = Some(Paths::with_user_dir(dir));
        self
    }

    /// Skips the user layer entirely.
    pub fn without_user_config(mut self) -> Self {
        self.user_paths = None;
        self
    }

    /// Candidate files, lowest precedence first. Files that do not exist
    /// are skipped by [`ConfigLoader::load`].
    pub fn layer_files(&self) -> Vec<(ConfigLayer, PathBuf)> {
        let user = self
            .user_paths
            .as_ref()
            .and_then(|paths| paths.user_config_file().ok())
            .map(|file| (ConfigLayer::User, file));

        let project = Paths::project_config_file(&self.project_dir);
        let local = Paths::local_config_file(&self.project_dir);
        user.into_iter()
            .chain([(ConfigLayer::Project, project), (ConfigLayer::Local, local)])
            .collect()
    }

    pub fn load(self) -> Result<WardenConfig> {
        let defaults = Config::try_from(&WardenConfig::default())?;

        let mut builder = Config::builder().add_source(defaults);
        for (layer, file) in self.layer_files() {
            if file.is_file() {
                tracing::debug!(?layer, file = %file.display(), "reading config layer");
                builder = builder.add_source(File::from(file).format(FileFormat::Toml));
            }
        }
        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .separator("_")
                .try_parsing(true),
        );

        let mut warden_config: WardenConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        warden_config.resolve_paths(&self.project_dir);
        Ok(warden_config)
    }

    /// Like [`ConfigLoader::load`], falling back to defaults on any error.
    pub fn load_or_default(self) -> WardenConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
