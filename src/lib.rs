//! WriteCare Agents: Priority Invocation Queue for Care Assistant Agents
//!
//! A registry of named AI agents and an in-memory priority queue that dispatches their
//! invocations in bounded batches, with per-attempt timeouts, exponential-backoff retries
//! and lifecycle events.

pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod processor;
pub mod queue;
pub mod tooling;
pub mod types;

pub use agent::{AgentDefinition, AgentRegistry, AgentState, AgentStatus};
pub use error::AgentError;
pub use events::{AgentEvent, EventType, ListenerId};
pub use processor::{AgentProcessor, ProcessRequest, ProcessorCatalog};
pub use queue::{AgentInvocation, AgentQueue, AgentResponse, Priority, QueueConfig, QueueStats};
