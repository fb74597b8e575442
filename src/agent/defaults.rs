//! Built-in agent definitions registered at startup.

use super::registry::AgentDefinition;
use crate::processor::{RISK_FLAG, SMART_ROSTER, VOICE_TO_NOTE};

pub const VOICE_TO_NOTE_AGENT: &str = "voice-to-note";
pub const SMART_ROSTER_AGENT: &str = "smart-roster";
pub const RISK_FLAG_AGENT: &str = "risk-flag";

/// The fixed startup list. Configuration entries with the same id override these.
pub fn default_definitions() -> Vec<AgentDefinition> {
    vec![
        AgentDefinition::new(RISK_FLAG_AGENT, RISK_FLAG)
            .with_name("Resident Risk Flagging")
            .with_priority(0)
            .with_timeout_ms(20_000)
            .with_retry_attempts(3)
            .with_capabilities([
                "risk_assessment",
                "vital_sign_analysis",
                "escalation",
            ]),
        AgentDefinition::new(VOICE_TO_NOTE_AGENT, VOICE_TO_NOTE)
            .with_name("Voice to Care Note")
            .with_priority(1)
            .with_timeout_ms(60_000)
            .with_retry_attempts(2)
            .with_capabilities([
                "transcription",
                "note_generation",
                "sentiment_analysis",
                "entity_extraction",
            ]),
        AgentDefinition::new(SMART_ROSTER_AGENT, SMART_ROSTER)
            .with_name("Smart Roster Optimiser")
            .with_priority(3)
            .with_timeout_ms(45_000)
            .with_retry_attempts(1)
            .with_dependencies([RISK_FLAG_AGENT])
            .with_capabilities(["roster_optimization", "constraint_analysis"]),
    ]
}
