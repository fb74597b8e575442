//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::AppConfig;
use config::ConfigError;
use std::path::{Path, PathBuf};

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Global config file path (`$XDG_CONFIG_HOME/writecare/config.toml`)
    pub fn global_config_path() -> Option<PathBuf> {
        super::paths::global_config_path().ok()
    }

    /// Load configuration from defaults, the global file, an optional explicit file and
    /// environment.
    pub fn load(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
        MergeService::load(explicit)
    }

    /// Load configuration from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<AppConfig, ConfigError> {
        MergeService::load_from_file(path)
    }
}
