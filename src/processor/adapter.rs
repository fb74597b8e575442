//! Port to the external language-model service.
//!
//! Built-in processors never parse free text: every completion is requested against a
//! JSON schema and the returned value is deserialized into a typed struct. A value that
//! fails to deserialize is an `InvalidOutput` error, which the retry wrapper retries.

use crate::error::AgentError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Audio reference for transcription
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl AudioInput {
    pub fn is_empty(&self) -> bool {
        self.audio_url.is_none() && self.audio_base64.is_none()
    }
}

/// Completion request with an output schema
#[derive(Debug, Clone, Serialize)]
pub struct StructuredPrompt {
    /// Stable task name, e.g. `care_note`; adapters may route on it
    pub task: String,
    pub system: String,
    pub user: String,
    /// JSON schema the response must satisfy
    pub schema: Value,
}

impl StructuredPrompt {
    pub fn new(task: &str, system: &str, user: String, schema: Value) -> Self {
        Self {
            task: task.to_string(),
            system: system.to_string(),
            user,
            schema,
        }
    }
}

/// External model service. Implementations live with the HTTP integrations.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    async fn transcribe(&self, audio: &AudioInput) -> Result<String, AgentError>;

    /// Return a JSON value conforming to `prompt.schema`
    async fn complete_structured(&self, prompt: StructuredPrompt) -> Result<Value, AgentError>;
}

/// Adapter for processes that register agents but never run them, such as the CLI.
/// Every call fails with a retryable adapter error.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredAdapter;

#[async_trait]
impl LlmAdapter for UnconfiguredAdapter {
    async fn transcribe(&self, _audio: &AudioInput) -> Result<String, AgentError> {
        Err(AgentError::Adapter("no language model adapter configured".to_string()))
    }

    async fn complete_structured(&self, prompt: StructuredPrompt) -> Result<Value, AgentError> {
        Err(AgentError::Adapter(format!(
            "no language model adapter configured for task '{}'",
            prompt.task
        )))
    }
}

/// Deserialize a structured completion into `T`.
pub fn parse_structured<T: DeserializeOwned>(task: &str, value: Value) -> Result<T, AgentError> {
    serde_json::from_value(value)
        .map_err(|e| AgentError::InvalidOutput(format!("{}: {}", task, e)))
}
