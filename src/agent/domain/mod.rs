pub mod config;
pub mod validation;

pub use self::config::AgentConfig;
pub use validation::validate_agent_config;
