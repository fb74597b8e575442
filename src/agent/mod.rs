//! Agent Registry
//!
//! Named agent definitions, their processors and runtime status. Definitions are
//! registered at startup from the built-in list and configuration, and live for the
//! lifetime of the process.

pub mod defaults;
pub mod domain;
mod registry;

pub use defaults::default_definitions;
pub use domain::AgentConfig;
pub use registry::{
    AgentDefinition, AgentRegistry, AgentState, AgentStatus, DEFAULT_AGENT_PRIORITY,
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_TIMEOUT_MS,
};
