//! Agent configuration as it appears in `config.toml` under `[agents.<id>]`.

use serde::{Deserialize, Serialize};

/// Agent configuration entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent id; defaults to the table key when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    /// Display name; defaults to the agent id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Processor type tag, e.g. `voice_to_note`
    pub agent_type: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Scheduling priority of the agent itself (lower = more urgent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<u32>,

    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub capabilities: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl AgentConfig {
    pub fn new(agent_type: impl Into<String>) -> Self {
        Self {
            agent_id: None,
            name: None,
            agent_type: agent_type.into(),
            enabled: default_enabled(),
            priority: None,
            timeout_ms: None,
            retry_attempts: None,
            dependencies: Vec::new(),
            capabilities: Vec::new(),
        }
    }

    /// Effective id for an entry stored under `key`
    pub fn resolved_id<'a>(&'a self, key: &'a str) -> &'a str {
        self.agent_id.as_deref().unwrap_or(key)
    }
}
