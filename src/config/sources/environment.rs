//! Environment variable source: WRITECARE__ prefix with __ separator

use crate::config::{ENV_PREFIX, ENV_SEPARATOR};
use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}

/// Add environment variable overlay to builder.
/// `WRITECARE__QUEUE__BATCH_SIZE=3` sets `queue.batch_size`.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(environment()))
}
