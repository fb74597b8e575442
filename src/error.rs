//! Error types for agent registration and invocation.

use thiserror::Error;

/// Errors raised by the registry, the dispatch queue, and agent processors.
///
/// Registry errors are returned to the caller of `register`/`set_enabled`.
/// Invocation errors never escape the queue: they are rendered into
/// [`AgentResponse::error`](crate::queue::AgentResponse).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("unknown agent type: {0}")]
    UnknownAgentType(String),

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("agent not enabled: {0}")]
    AgentDisabled(String),

    #[error("agent '{agent_id}' timeout after {timeout_ms}ms")]
    AgentTimeout { agent_id: String, timeout_ms: u64 },

    /// Failure reported by an external adapter call.
    #[error("adapter error: {0}")]
    Adapter(String),

    /// Adapter output did not match the expected structured schema.
    #[error("invalid structured output: {0}")]
    InvalidOutput(String),

    /// Invocation payload rejected by the processor before any adapter call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invocation cancelled")]
    Cancelled,

    #[error("agent queue is stopped")]
    QueueStopped,

    #[error("invalid agent definition: {0}")]
    InvalidDefinition(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl AgentError {
    /// Whether the retry wrapper should attempt the call again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::AgentTimeout { .. } | AgentError::Adapter(_) | AgentError::InvalidOutput(_)
        )
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::InvalidOutput(err.to_string())
    }
}

impl From<config::ConfigError> for AgentError {
    fn from(err: config::ConfigError) -> Self {
        AgentError::ConfigError(err.to_string())
    }
}
