//! Global config file source (`$XDG_CONFIG_HOME/writecare/config.toml`). Optional.

use crate::config::paths;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use tracing::debug;

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    match paths::global_config_path() {
        Ok(path) => {
            debug!(path = %path.display(), exists = path.is_file(), "Global config file");
            Ok(builder.add_source(File::from(path).required(false)))
        }
        Err(e) => {
            debug!(error = %e, "Skipping global config file");
            Ok(builder)
        }
    }
}
