//! Agent Invocation Queue
//!
//! Unbounded in-memory queue of agent invocations drained by a periodic dispatch loop.
//! Each tick sorts the pending list by priority, removes a bounded batch and runs it
//! concurrently; every call goes through the timeout/retry wrapper in [`retry`].

mod dispatch;
pub mod retry;

pub use dispatch::{AgentQueue, InvocationHandle};
pub use retry::{call_with_retry, RetryOutcome, RetryPolicy};

use crate::error::AgentError;
use crate::types::{AgentId, ContextMap, CorrelationId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;

/// Priority label of an invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// Sort rank; lower is dispatched first
    pub fn rank(self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::High => 1,
            Priority::Normal => 2,
            Priority::Low => 3,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Urgent => write!(f, "urgent"),
            Priority::High => write!(f, "high"),
            Priority::Normal => write!(f, "normal"),
            Priority::Low => write!(f, "low"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "urgent" => Ok(Priority::Urgent),
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            other => Err(format!(
                "Invalid priority: {} (must be 'urgent', 'high', 'normal', or 'low')",
                other
            )),
        }
    }
}

/// Request to run an agent once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInvocation {
    pub agent_id: AgentId,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub context: ContextMap,
    #[serde(default)]
    pub priority: Priority,
    /// Overrides the agent's configured timeout for this call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Generated on submission when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
}

impl AgentInvocation {
    pub fn new(agent_id: impl Into<String>, input: Value) -> Self {
        Self {
            agent_id: agent_id.into(),
            input,
            context: ContextMap::new(),
            priority: Priority::default(),
            timeout_ms: None,
            correlation_id: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// Settled outcome of one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub agent_id: AgentId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processing_time_ms: u64,
    /// Calls made to the agent's processor
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
}

impl AgentResponse {
    pub fn succeeded(
        agent_id: impl Into<String>,
        result: Value,
        processing_time_ms: u64,
        attempts: u32,
        correlation_id: Option<CorrelationId>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            success: true,
            result: Some(result),
            error: None,
            processing_time_ms,
            attempts,
            correlation_id,
        }
    }

    pub fn failed(
        agent_id: impl Into<String>,
        error: &AgentError,
        processing_time_ms: u64,
        attempts: u32,
        correlation_id: Option<CorrelationId>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            success: false,
            result: None,
            error: Some(error.to_string()),
            processing_time_ms,
            attempts,
            correlation_id,
        }
    }
}

/// Queue configuration (`[queue]` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Dispatch loop period
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Maximum invocations dispatched per tick
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// First retry delay; doubles per attempt
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Broadcast buffer for async event subscribers
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_batch_size() -> usize {
    5
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_event_capacity() -> usize {
    256
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            batch_size: default_batch_size(),
            backoff_base_ms: default_backoff_base_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl QueueConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval_ms == 0 {
            return Err("queue.tick_interval_ms must be greater than zero".to_string());
        }
        if self.batch_size == 0 {
            return Err("queue.batch_size must be greater than zero".to_string());
        }
        if self.max_backoff_ms < self.backoff_base_ms {
            return Err(format!(
                "queue.max_backoff_ms ({}) must not be below queue.backoff_base_ms ({})",
                self.max_backoff_ms, self.backoff_base_ms
            ));
        }
        if self.event_capacity == 0 {
            return Err("queue.event_capacity must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Number of queued requests not yet dispatched
    pub pending: usize,
    /// Number of requests currently being processed
    pub processing: usize,
    /// Number of successful responses
    pub completed: usize,
    /// Number of failed responses, including immediate rejections
    pub failed: usize,
}
