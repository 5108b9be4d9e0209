//! Where configuration files live

use crate::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Project config file name, checked into the repository.
pub const PROJECT_CONFIG_FILE: &str = "warden.toml";

/// Per-checkout overrides, kept out of version control.
pub const LOCAL_CONFIG_FILE: &str = "warden.local.toml";

const USER_CONFIG_FILE: &str = "config.toml";

/// Locations of Warden's configuration files.
///
/// The per-user directory is discovered once (`$XDG_CONFIG_HOME/warden` on
/// Linux) or pinned explicitly with [`Paths::with_user_dir`].
#[derive(Debug, Clone)]
pub struct Paths {
    user_dir: Option<PathBuf>,
}

impl Paths {
    pub fn new() -> Self {
        Self {
            user_dir: ProjectDirs::from("dev", "Warden", "warden")
                .map(|dirs| dirs.config_dir().to_path_buf()),
        }
    }

    /// Uses `dir` as the per-user config directory instead of the XDG one.
    pub fn with_user_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            user_dir: Some(dir.into()),
        }
    }

    pub fn user_config_dir(&self) -> Result<&Path, ConfigError> {
        self.user_dir.as_deref().ok_or_else(|| {
            ConfigError::XdgError("no home directory to hold user configuration".to_string())
        })
    }

    pub fn user_config_file(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.user_config_dir()?.join(USER_CONFIG_FILE))
    }

    pub fn project_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join(PROJECT_CONFIG_FILE)
    }

    pub fn local_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join(LOCAL_CONFIG_FILE)
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
