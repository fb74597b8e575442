//! Agent registry, definitions and runtime status.

use crate::agent::domain::{validate_agent_config, AgentConfig};
use crate::error::AgentError;
use crate::events::{AgentEvent, EventBus, EventType};
use crate::processor::{AgentProcessor, ProcessorCatalog};
use crate::types::AgentId;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default per-call timeout for agents that do not set one
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default retry count for agents that do not set one
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
/// Default agent priority (lower = more urgent)
pub const DEFAULT_AGENT_PRIORITY: u8 = 2;

/// Named agent definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub id: AgentId,
    pub name: String,
    /// Processor type tag; must be present in the processor catalog
    pub agent_type: String,
    pub enabled: bool,
    /// Lower = more urgent
    pub priority: u8,
    pub timeout_ms: u64,
    /// Additional attempts after the first failure
    pub retry_attempts: u32,
    /// Informational only; never resolved by the queue
    #[serde(default)]
    pub dependencies: Vec<AgentId>,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
}

impl AgentDefinition {
    /// Create an enabled definition with default timeout and retries
    pub fn new(id: impl Into<String>, agent_type: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            agent_type: agent_type.into(),
            enabled: true,
            priority: DEFAULT_AGENT_PRIORITY,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            dependencies: Vec::new(),
            capabilities: BTreeSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Build a definition from a `[agents.<key>]` configuration entry
    pub fn from_config(key: &str, config: &AgentConfig) -> Result<Self, AgentError> {
        validate_agent_config(key, config).map_err(AgentError::InvalidDefinition)?;

        let id = config.resolved_id(key).to_string();
        Ok(Self {
            name: config.name.clone().unwrap_or_else(|| id.clone()),
            id,
            agent_type: config.agent_type.clone(),
            enabled: config.enabled,
            priority: config.priority.unwrap_or(DEFAULT_AGENT_PRIORITY),
            timeout_ms: config.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
            retry_attempts: config.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            dependencies: config.dependencies.clone(),
            capabilities: config.capabilities.iter().cloned().collect(),
        })
    }

    fn validate(&self) -> Result<(), AgentError> {
        if self.id.trim().is_empty() {
            return Err(AgentError::InvalidDefinition(
                "agent id cannot be empty".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(AgentError::InvalidDefinition(format!(
                "agent '{}' timeout_ms must be greater than zero",
                self.id
            )));
        }
        Ok(())
    }
}

/// Observable agent state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Idle,
    /// At least one invocation in flight
    Busy,
    /// Last settled invocation failed
    Error,
    Disabled,
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Busy => write!(f, "busy"),
            Self::Error => write!(f, "error"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

/// Point-in-time status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub agent_id: AgentId,
    pub name: String,
    pub state: AgentState,
    pub enabled: bool,
    pub in_flight: usize,
    pub total_invocations: u64,
    pub failed_invocations: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_invoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct AgentActivity {
    in_flight: usize,
    total: u64,
    failed: u64,
    last_failed: bool,
    last_error: Option<String>,
    last_invoked_at: Option<DateTime<Utc>>,
}

struct AgentEntry {
    definition: AgentDefinition,
    processor: Arc<dyn AgentProcessor>,
    activity: AgentActivity,
}

impl AgentEntry {
    fn state(&self) -> AgentState {
        if !self.definition.enabled {
            AgentState::Disabled
        } else if self.activity.in_flight > 0 {
            AgentState::Busy
        } else if self.activity.last_failed {
            AgentState::Error
        } else {
            AgentState::Idle
        }
    }

    fn status(&self) -> AgentStatus {
        AgentStatus {
            agent_id: self.definition.id.clone(),
            name: self.definition.name.clone(),
            state: self.state(),
            enabled: self.definition.enabled,
            in_flight: self.activity.in_flight,
            total_invocations: self.activity.total,
            failed_invocations: self.activity.failed,
            last_error: self.activity.last_error.clone(),
            last_invoked_at: self.activity.last_invoked_at,
        }
    }
}

/// Agent registry
///
/// Definitions live for the whole process; only the enabled flag and runtime activity
/// change after registration.
pub struct AgentRegistry {
    agents: RwLock<HashMap<AgentId, AgentEntry>>,
    catalog: ProcessorCatalog,
    events: Arc<EventBus>,
}

impl AgentRegistry {
    pub fn new(catalog: ProcessorCatalog, events: Arc<EventBus>) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            catalog,
            events,
        }
    }

    /// Register an agent, replacing any previous definition with the same id.
    ///
    /// Runtime activity (counters, in-flight count, last error) is kept across a replacement.
    pub fn register(&self, definition: AgentDefinition) -> Result<(), AgentError> {
        definition.validate()?;
        let processor = self.catalog.resolve(&definition.agent_type)?;

        let payload = json!({
            "agent_type": definition.agent_type,
            "enabled": definition.enabled,
            "capabilities": definition.capabilities,
        });
        let agent_id = definition.id.clone();

        // Activity survives replacement so in-flight invocations settle against it
        let replaced = {
            let mut agents = self.agents.write();
            let previous = agents.remove(&agent_id);
            let replaced = previous.is_some();
            let activity = previous.map(|entry| entry.activity).unwrap_or_default();
            agents.insert(
                agent_id.clone(),
                AgentEntry {
                    definition,
                    processor,
                    activity,
                },
            );
            replaced
        };

        if replaced {
            warn!(agent_id = %agent_id, "Replaced existing agent definition");
        } else {
            debug!(agent_id = %agent_id, "Registered agent");
        }

        self.events
            .emit(AgentEvent::new(EventType::Registered, agent_id, payload));
        Ok(())
    }

    /// Register each definition in order, stopping at the first failure
    pub fn register_all<I>(&self, definitions: I) -> Result<usize, AgentError>
    where
        I: IntoIterator<Item = AgentDefinition>,
    {
        let mut count = 0;
        for definition in definitions {
            self.register(definition)?;
            count += 1;
        }
        Ok(count)
    }

    /// Register agents from configuration; entries override defaults with the same id
    pub fn load_from_config(
        &self,
        agents: &HashMap<String, AgentConfig>,
    ) -> Result<usize, AgentError> {
        let mut keys: Vec<&String> = agents.keys().collect();
        keys.sort();

        let mut count = 0;
        for key in keys {
            let definition = AgentDefinition::from_config(key, &agents[key])?;
            self.register(definition)?;
            count += 1;
        }
        info!(count, "Loaded agents from configuration");
        Ok(count)
    }

    /// Toggle availability of an agent
    pub fn set_enabled(&self, agent_id: &str, enabled: bool) -> Result<(), AgentError> {
        let previous = {
            let mut agents = self.agents.write();
            let entry = agents
                .get_mut(agent_id)
                .ok_or_else(|| AgentError::AgentNotFound(agent_id.to_string()))?;
            std::mem::replace(&mut entry.definition.enabled, enabled)
        };

        info!(agent_id, enabled, previous, "Agent enabled flag changed");
        self.events.emit(AgentEvent::new(
            EventType::EnabledChanged,
            agent_id,
            json!({ "enabled": enabled, "previous": previous }),
        ));
        Ok(())
    }

    pub fn get(&self, agent_id: &str) -> Option<AgentDefinition> {
        self.agents
            .read()
            .get(agent_id)
            .map(|entry| entry.definition.clone())
    }

    pub fn get_status(&self, agent_id: &str) -> Result<AgentStatus, AgentError> {
        self.agents
            .read()
            .get(agent_id)
            .map(AgentEntry::status)
            .ok_or_else(|| AgentError::AgentNotFound(agent_id.to_string()))
    }

    /// Status of every agent, ordered like [`AgentRegistry::list`]
    pub fn statuses(&self) -> Vec<AgentStatus> {
        let agents = self.agents.read();
        let mut entries: Vec<&AgentEntry> = agents.values().collect();
        entries.sort_by(|a, b| {
            a.definition
                .priority
                .cmp(&b.definition.priority)
                .then_with(|| a.definition.id.cmp(&b.definition.id))
        });
        entries.into_iter().map(AgentEntry::status).collect()
    }

    /// All definitions ordered by agent priority, then id
    pub fn list(&self) -> Vec<AgentDefinition> {
        let mut definitions: Vec<AgentDefinition> = self
            .agents
            .read()
            .values()
            .map(|entry| entry.definition.clone())
            .collect();
        definitions.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        definitions
    }

    pub fn list_by_capability(&self, capability: &str) -> Vec<AgentDefinition> {
        self.list()
            .into_iter()
            .filter(|definition| definition.has_capability(capability))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }

    /// Fail fast for unknown or disabled agents
    pub(crate) fn check_available(&self, agent_id: &str) -> Result<(), AgentError> {
        let agents = self.agents.read();
        let entry = agents
            .get(agent_id)
            .ok_or_else(|| AgentError::AgentNotFound(agent_id.to_string()))?;
        if !entry.definition.enabled {
            return Err(AgentError::AgentDisabled(agent_id.to_string()));
        }
        Ok(())
    }

    /// Mark an invocation as started and hand out what the dispatcher needs
    pub(crate) fn begin_invocation(
        &self,
        agent_id: &str,
    ) -> Result<(AgentDefinition, Arc<dyn AgentProcessor>), AgentError> {
        let mut agents = self.agents.write();
        let entry = agents
            .get_mut(agent_id)
            .ok_or_else(|| AgentError::AgentNotFound(agent_id.to_string()))?;
        if !entry.definition.enabled {
            return Err(AgentError::AgentDisabled(agent_id.to_string()));
        }
        entry.activity.in_flight += 1;
        entry.activity.total += 1;
        entry.activity.last_invoked_at = Some(Utc::now());
        Ok((entry.definition.clone(), Arc::clone(&entry.processor)))
    }

    pub(crate) fn finish_invocation(&self, agent_id: &str, error: Option<&AgentError>) {
        let mut agents = self.agents.write();
        if let Some(entry) = agents.get_mut(agent_id) {
            let activity = &mut entry.activity;
            activity.in_flight = activity.in_flight.saturating_sub(1);
            match error {
                Some(err) => {
                    activity.failed += 1;
                    activity.last_failed = true;
                    activity.last_error = Some(err.to_string());
                }
                None => activity.last_failed = false,
            }
        }
    }
}
