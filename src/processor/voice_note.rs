//! Voice-to-note processor: transcription, care note, sentiment, entities.

use super::adapter::{parse_structured, AudioInput, LlmAdapter, StructuredPrompt};
use super::{until_cancelled, AgentProcessor, ProcessRequest};
use crate::error::AgentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

const NOTE_SYSTEM: &str = "You are a care documentation assistant. Write factual, person-centred \
care notes from carer dictation. Do not invent clinical facts.";
const SENTIMENT_SYSTEM: &str =
    "Classify the emotional tone of a care note with respect to the resident's wellbeing.";
const ENTITY_SYSTEM: &str =
    "Extract people, medications, body locations, times and clinical observations from a care note.";

/// Voice note request payload
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceNoteRequest {
    #[serde(default)]
    pub audio: AudioInput,
    /// Pre-transcribed text; skips transcription when present
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub resident_id: Option<String>,
    #[serde(default = "default_note_type")]
    pub note_type: String,
}

fn default_note_type() -> String {
    "daily".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareNote {
    pub summary: String,
    #[serde(default)]
    pub observations: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub follow_up_required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
    Concerning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    /// -1.0 (very negative) to 1.0 (very positive)
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct EntityList {
    entities: Vec<Entity>,
}

/// Combined result of the four adapter calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceNoteResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resident_id: Option<String>,
    pub note_type: String,
    pub transcript: String,
    pub note: CareNote,
    pub sentiment: Sentiment,
    pub entities: Vec<Entity>,
}

pub struct VoiceNoteProcessor {
    adapter: Arc<dyn LlmAdapter>,
}

impl VoiceNoteProcessor {
    pub fn new(adapter: Arc<dyn LlmAdapter>) -> Self {
        Self { adapter }
    }

    async fn generate_note(&self, request: &VoiceNoteRequest, transcript: &str) -> Result<CareNote, AgentError> {
        let prompt = StructuredPrompt::new(
            "care_note",
            NOTE_SYSTEM,
            format!(
                "Note type: {}\nDictation:\n{}",
                request.note_type, transcript
            ),
            json!({
                "type": "object",
                "required": ["summary"],
                "properties": {
                    "summary": {"type": "string"},
                    "observations": {"type": "array", "items": {"type": "string"}},
                    "actions": {"type": "array", "items": {"type": "string"}},
                    "follow_up_required": {"type": "boolean"}
                }
            }),
        );
        let note: CareNote =
            parse_structured("care_note", self.adapter.complete_structured(prompt).await?)?;
        if note.summary.trim().is_empty() {
            return Err(AgentError::InvalidOutput("care_note: empty summary".to_string()));
        }
        Ok(note)
    }

    async fn analyse_sentiment(&self, summary: &str) -> Result<Sentiment, AgentError> {
        let prompt = StructuredPrompt::new(
            "sentiment",
            SENTIMENT_SYSTEM,
            summary.to_string(),
            json!({
                "type": "object",
                "required": ["label", "score"],
                "properties": {
                    "label": {"enum": ["positive", "neutral", "negative", "concerning"]},
                    "score": {"type": "number", "minimum": -1.0, "maximum": 1.0}
                }
            }),
        );
        let sentiment: Sentiment =
            parse_structured("sentiment", self.adapter.complete_structured(prompt).await?)?;
        if !(-1.0..=1.0).contains(&sentiment.score) {
            return Err(AgentError::InvalidOutput(format!(
                "sentiment: score {} out of range",
                sentiment.score
            )));
        }
        Ok(sentiment)
    }

    async fn extract_entities(&self, transcript: &str) -> Result<Vec<Entity>, AgentError> {
        let prompt = StructuredPrompt::new(
            "entities",
            ENTITY_SYSTEM,
            transcript.to_string(),
            json!({
                "type": "object",
                "required": ["entities"],
                "properties": {
                    "entities": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["kind", "text"],
                            "properties": {"kind": {"type": "string"}, "text": {"type": "string"}}
                        }
                    }
                }
            }),
        );
        let list: EntityList =
            parse_structured("entities", self.adapter.complete_structured(prompt).await?)?;
        Ok(list.entities)
    }

    async fn run(&self, request: VoiceNoteRequest) -> Result<VoiceNoteResult, AgentError> {
        let transcript = match request.transcript.clone() {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                if request.audio.is_empty() {
                    return Err(AgentError::InvalidInput(
                        "voice note requires audio or a transcript".to_string(),
                    ));
                }
                self.adapter.transcribe(&request.audio).await?
            }
        };

        let note = self.generate_note(&request, &transcript).await?;
        let (sentiment, entities) = futures::try_join!(
            self.analyse_sentiment(&note.summary),
            self.extract_entities(&transcript)
        )?;

        Ok(VoiceNoteResult {
            resident_id: request.resident_id,
            note_type: request.note_type,
            transcript,
            note,
            sentiment,
            entities,
        })
    }
}

#[async_trait]
impl AgentProcessor for VoiceNoteProcessor {
    async fn process(&self, request: ProcessRequest) -> Result<Value, AgentError> {
        let voice_request: VoiceNoteRequest = request.parse_input()?;
        debug!(
            agent_id = %request.agent_id,
            attempt = request.attempt,
            note_type = %voice_request.note_type,
            "Processing voice note"
        );
        let result = until_cancelled(&request.cancel, self.run(voice_request)).await?;
        Ok(serde_json::to_value(result)?)
    }
}
