//! Core types shared across the agent queue.

/// AgentId: Unique identifier of a registered agent definition
pub type AgentId = String;

/// CorrelationId: Caller-supplied or generated id tying an invocation to its response and events
pub type CorrelationId = String;

/// Free-form invocation context (resident id, user id, request metadata, ...)
pub type ContextMap = serde_json::Map<String, serde_json::Value>;

/// Generate a fresh correlation id for invocations that arrive without one.
pub fn new_correlation_id() -> CorrelationId {
    uuid::Uuid::new_v4().to_string()
}
