//! Built-in defaults seeded into every builder, so partial files only override what they name.

use crate::config::AppConfig;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};

/// Start a builder with every scalar of the default [`AppConfig`] set as a default value.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = AppConfig::default();
    let queue = &defaults.queue;
    let logging = &defaults.logging;

    config::Config::builder()
        .set_default("queue.tick_interval_ms", queue.tick_interval_ms)?
        .set_default("queue.batch_size", queue.batch_size as u64)?
        .set_default("queue.backoff_base_ms", queue.backoff_base_ms)?
        .set_default("queue.max_backoff_ms", queue.max_backoff_ms)?
        .set_default("queue.event_capacity", queue.event_capacity as u64)?
        .set_default("logging.enabled", logging.enabled)?
        .set_default("logging.level", logging.level.as_str())?
        .set_default("logging.format", logging.format.as_str())?
        .set_default("logging.output", logging.output.as_str())?
        .set_default("logging.color", logging.color)
}
