//! XDG Base Directory locations for configuration.

use crate::error::AgentError;
use std::path::PathBuf;

/// Application directory name under the config home
pub const APP_DIR: &str = "writecare";

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise defaults to `$HOME/.config`
pub fn config_home() -> Result<PathBuf, AgentError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Ok(PathBuf::from(xdg_config_home));
        }
    }

    let home = std::env::var("HOME").map_err(|_| {
        AgentError::ConfigError(
            "Could not determine XDG config home directory (HOME not set)".to_string(),
        )
    })?;

    Ok(PathBuf::from(home).join(".config"))
}

/// Returns `$XDG_CONFIG_HOME/writecare/config.toml`. The file need not exist.
pub fn global_config_path() -> Result<PathBuf, AgentError> {
    Ok(config_home()?.join(APP_DIR).join("config.toml"))
}
