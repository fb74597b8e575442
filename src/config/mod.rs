//! Configuration
//!
//! Layered application configuration built with the `config` crate. Precedence, lowest
//! to highest: built-in defaults, the global file, an explicit file, then environment
//! variables (`WRITECARE__SECTION__KEY`).

mod facade;
mod merge;
pub mod paths;
mod sources;

pub use facade::ConfigLoader;

use crate::agent::domain::validate_agent_config;
use crate::agent::AgentConfig;
use crate::error::AgentError;
use crate::logging::LoggingConfig;
use crate::queue::QueueConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Environment variable prefix for config overrides
pub const ENV_PREFIX: &str = "WRITECARE";

/// Separator between prefix, section and key in environment variable names
pub const ENV_SEPARATOR: &str = "__";

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Agents keyed by id; override built-in definitions with the same id
    #[serde(default)]
    pub agents: HashMap<String, AgentConfig>,
}

impl AppConfig {
    /// Check every section, reporting the first problem found.
    pub fn validate(&self) -> Result<(), AgentError> {
        self.queue.validate().map_err(AgentError::ConfigError)?;
        self.logging.validate()?;

        let mut keys: Vec<&String> = self.agents.keys().collect();
        keys.sort();
        for key in keys {
            validate_agent_config(key, &self.agents[key]).map_err(AgentError::ConfigError)?;
        }
        Ok(())
    }

    /// Render as TOML, as accepted by [`ConfigLoader::load_from_file`]
    pub fn to_toml(&self) -> Result<String, AgentError> {
        toml::to_string_pretty(self).map_err(|e| AgentError::ConfigError(e.to_string()))
    }
}
