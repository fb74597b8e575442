//! Agent Lifecycle Events
//!
//! Publish/subscribe for queue and registry transitions. Listeners registered with
//! [`EventBus::on`] run synchronously on the emitting task; async consumers can take a
//! broadcast receiver from [`EventBus::subscribe`] instead.

use crate::types::CorrelationId;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Lifecycle transition tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Invocation picked up by the dispatch loop
    Invoked,
    /// Invocation settled successfully
    Completed,
    /// Invocation settled with a failure
    Error,
    /// Agent definition registered
    Registered,
    /// Agent enabled flag toggled
    EnabledChanged,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invoked => write!(f, "invoked"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
            Self::Registered => write!(f, "registered"),
            Self::EnabledChanged => write!(f, "enabled_changed"),
        }
    }
}

/// Event published at each lifecycle transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    pub event_type: EventType,
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
}

impl AgentEvent {
    pub fn new(event_type: EventType, agent_id: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type,
            agent_id: agent_id.into(),
            timestamp: Utc::now(),
            payload,
            correlation_id: None,
        }
    }

    pub fn with_correlation(mut self, correlation_id: Option<CorrelationId>) -> Self {
        self.correlation_id = correlation_id;
        self
    }
}

/// Handle returned by [`EventBus::on`], used to remove the listener again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Arc<dyn Fn(&AgentEvent) + Send + Sync>;

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Fire-and-forget event emitter
pub struct EventBus {
    listeners: RwLock<HashMap<EventType, Vec<(ListenerId, Listener)>>>,
    sender: broadcast::Sender<AgentEvent>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            listeners: RwLock::new(HashMap::new()),
            sender,
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener for one event type
    pub fn on<F>(&self, event_type: EventType, listener: F) -> ListenerId
    where
        F: Fn(&AgentEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .entry(event_type)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        for entries in listeners.values_mut() {
            if let Some(pos) = entries.iter().position(|(entry_id, _)| *entry_id == id) {
                entries.remove(pos);
                return true;
            }
        }
        false
    }

    /// Receive every event on an async channel. Slow receivers observe `Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self, event_type: EventType) -> usize {
        self.listeners
            .read()
            .get(&event_type)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn emit(&self, event: AgentEvent) {
        // Clone the listener list so callbacks may call on/off without deadlocking
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .get(&event.event_type)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        for listener in listeners {
            listener(&event);
        }

        trace!(
            event_type = %event.event_type,
            agent_id = %event.agent_id,
            "Emitted agent event"
        );

        // No receivers is fine
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
