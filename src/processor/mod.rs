//! Agent Processors
//!
//! A processor is the type-specific body of an agent: it turns an invocation's input
//! and context into a JSON result. Processors are looked up by type tag in a
//! [`ProcessorCatalog`]; registration of an agent whose type tag is not in the catalog
//! fails with `UnknownAgentType`.

pub mod adapter;
pub mod risk_flag;
pub mod roster;
pub mod voice_note;

use crate::error::AgentError;
use crate::types::{AgentId, ContextMap, CorrelationId};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use adapter::{AudioInput, LlmAdapter, StructuredPrompt, UnconfiguredAdapter};

/// Type tag of the voice-to-note processor
pub const VOICE_TO_NOTE: &str = "voice_to_note";
/// Type tag of the smart roster processor
pub const SMART_ROSTER: &str = "smart_roster";
/// Type tag of the risk flag processor
pub const RISK_FLAG: &str = "risk_flag";

/// One attempt of an invocation as seen by a processor
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub agent_id: AgentId,
    pub input: Value,
    pub context: ContextMap,
    pub correlation_id: Option<CorrelationId>,
    /// Zero-based attempt number
    pub attempt: u32,
    /// Cancelled when the attempt times out or the queue stops
    pub cancel: CancellationToken,
}

impl ProcessRequest {
    /// Deserialize the input payload into the processor's typed request.
    pub fn parse_input<T: DeserializeOwned>(&self) -> Result<T, AgentError> {
        serde_json::from_value(self.input.clone())
            .map_err(|e| AgentError::InvalidInput(e.to_string()))
    }
}

/// Type-specific processing function of an agent
#[async_trait]
pub trait AgentProcessor: Send + Sync {
    async fn process(&self, request: ProcessRequest) -> Result<Value, AgentError>;
}

/// Processor backed by an async closure
pub struct FnProcessor<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> AgentProcessor for FnProcessor<F>
where
    F: Fn(ProcessRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, AgentError>> + Send,
{
    async fn process(&self, request: ProcessRequest) -> Result<Value, AgentError> {
        (self.f)(request).await
    }
}

/// Wrap an async closure as a processor.
pub fn from_fn<F, Fut>(f: F) -> Arc<dyn AgentProcessor>
where
    F: Fn(ProcessRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, AgentError>> + Send + 'static,
{
    Arc::new(FnProcessor { f })
}

/// Run `fut` unless `cancel` fires first.
pub async fn until_cancelled<T, Fut>(cancel: &CancellationToken, fut: Fut) -> Result<T, AgentError>
where
    Fut: Future<Output = Result<T, AgentError>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(AgentError::Cancelled),
        result = fut => result,
    }
}

/// Type tag → processor lookup table
#[derive(Clone, Default)]
pub struct ProcessorCatalog {
    processors: HashMap<String, Arc<dyn AgentProcessor>>,
}

impl ProcessorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the three built-in care processors bound to `adapter`
    pub fn with_builtins(adapter: Arc<dyn LlmAdapter>) -> Self {
        Self::new()
            .with(
                VOICE_TO_NOTE,
                Arc::new(voice_note::VoiceNoteProcessor::new(Arc::clone(&adapter))),
            )
            .with(
                SMART_ROSTER,
                Arc::new(roster::SmartRosterProcessor::new(Arc::clone(&adapter))),
            )
            .with(RISK_FLAG, Arc::new(risk_flag::RiskFlagProcessor::new(adapter)))
    }

    pub fn with(mut self, agent_type: impl Into<String>, processor: Arc<dyn AgentProcessor>) -> Self {
        self.insert(agent_type, processor);
        self
    }

    pub fn insert(&mut self, agent_type: impl Into<String>, processor: Arc<dyn AgentProcessor>) {
        self.processors.insert(agent_type.into(), processor);
    }

    pub fn resolve(&self, agent_type: &str) -> Result<Arc<dyn AgentProcessor>, AgentError> {
        self.processors
            .get(agent_type)
            .cloned()
            .ok_or_else(|| AgentError::UnknownAgentType(agent_type.to_string()))
    }

    pub fn contains(&self, agent_type: &str) -> bool {
        self.processors.contains_key(agent_type)
    }

    /// Registered type tags, sorted
    pub fn agent_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.processors.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}
