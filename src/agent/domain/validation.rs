//! Agent configuration validation owned by the agent domain.

use super::config::AgentConfig;

/// Upper bound on configured retries; backoff grows as 2^attempt.
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Validate agent configuration stored under `key`.
pub fn validate_agent_config(key: &str, agent: &AgentConfig) -> Result<(), String> {
    if agent.resolved_id(key).trim().is_empty() {
        return Err("Agent ID cannot be empty".to_string());
    }

    if agent.agent_type.trim().is_empty() {
        return Err(format!(
            "Agent '{}' requires a non-empty agent_type",
            agent.resolved_id(key)
        ));
    }

    if let Some(ref name) = agent.name {
        if name.trim().is_empty() {
            return Err("Agent name cannot be empty if provided".to_string());
        }
    }

    if agent.timeout_ms == Some(0) {
        return Err(format!(
            "Agent '{}' timeout_ms must be greater than zero",
            agent.resolved_id(key)
        ));
    }

    if let Some(retries) = agent.retry_attempts {
        if retries > MAX_RETRY_ATTEMPTS {
            return Err(format!(
                "Agent '{}' retry_attempts must be at most {}, got {}",
                agent.resolved_id(key),
                MAX_RETRY_ATTEMPTS,
                retries
            ));
        }
    }

    if agent
        .dependencies
        .iter()
        .any(|dep| dep == agent.resolved_id(key))
    {
        return Err(format!(
            "Agent '{}' cannot depend on itself",
            agent.resolved_id(key)
        ));
    }

    Ok(())
}
