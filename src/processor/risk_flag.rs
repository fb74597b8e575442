//! Risk flag processor.
//!
//! Vitals and observations are assessed by the model into a typed [`RiskAssessment`];
//! the escalation bucket follows directly from its `risk_level`.

use super::adapter::{parse_structured, LlmAdapter, StructuredPrompt};
use super::{until_cancelled, AgentProcessor, ProcessRequest};
use crate::error::AgentError;
use crate::queue::Priority;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const RISK_SYSTEM: &str = "You are a clinical risk screening assistant in a care home. Assess \
deterioration risk from vital signs and carer observations. When unsure, choose the higher level.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vitals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systolic_bp: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diastolic_bp: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oxygen_saturation: Option<f32>,
}

impl Vitals {
    fn is_empty(&self) -> bool {
        self.heart_rate.is_none()
            && self.systolic_bp.is_none()
            && self.diastolic_bp.is_none()
            && self.temperature_c.is_none()
            && self.respiratory_rate.is_none()
            && self.oxygen_saturation.is_none()
    }
}

/// Risk flag request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFlagRequest {
    pub resident_id: String,
    #[serde(default)]
    pub vitals: Vitals,
    #[serde(default)]
    pub observations: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// Escalation bucket for the assessed level
    pub fn priority(self) -> Priority {
        match self {
            RiskLevel::Critical => Priority::Urgent,
            RiskLevel::High => Priority::High,
            RiskLevel::Medium => Priority::Normal,
            RiskLevel::Low => Priority::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFlagResult {
    pub resident_id: String,
    pub assessment: RiskAssessment,
    pub priority: Priority,
    pub escalate: bool,
}

pub struct RiskFlagProcessor {
    adapter: Arc<dyn LlmAdapter>,
}

impl RiskFlagProcessor {
    pub fn new(adapter: Arc<dyn LlmAdapter>) -> Self {
        Self { adapter }
    }

    fn build_prompt(request: &RiskFlagRequest) -> Result<StructuredPrompt, AgentError> {
        Ok(StructuredPrompt::new(
            "risk_assessment",
            RISK_SYSTEM,
            format!(
                "Vitals:\n{}\nObservations:\n{}\nCurrent medications:\n{}",
                serde_json::to_string_pretty(&request.vitals)?,
                serde_json::to_string_pretty(&request.observations)?,
                serde_json::to_string_pretty(&request.medications)?
            ),
            json!({
                "type": "object",
                "required": ["risk_level"],
                "properties": {
                    "risk_level": {"enum": ["critical", "high", "medium", "low"]},
                    "risk_factors": {"type": "array", "items": {"type": "string"}},
                    "recommended_actions": {"type": "array", "items": {"type": "string"}},
                    "confidence": {"type": "number", "minimum": 0.0, "maximum": 1.0}
                }
            }),
        ))
    }

    async fn run(&self, request: RiskFlagRequest) -> Result<RiskFlagResult, AgentError> {
        if request.resident_id.trim().is_empty() {
            return Err(AgentError::InvalidInput("resident_id is required".to_string()));
        }
        if request.vitals.is_empty() && request.observations.is_empty() {
            return Err(AgentError::InvalidInput(
                "risk flag requires vitals or observations".to_string(),
            ));
        }

        let prompt = Self::build_prompt(&request)?;
        let assessment: RiskAssessment = parse_structured(
            "risk_assessment",
            self.adapter.complete_structured(prompt).await?,
        )?;

        let priority = assessment.risk_level.priority();
        let escalate = matches!(priority, Priority::Urgent | Priority::High);
        if escalate {
            warn!(
                resident_id = %request.resident_id,
                risk_level = ?assessment.risk_level,
                "Resident flagged for escalation"
            );
        }

        Ok(RiskFlagResult {
            resident_id: request.resident_id,
            assessment,
            priority,
            escalate,
        })
    }
}

#[async_trait]
impl AgentProcessor for RiskFlagProcessor {
    async fn process(&self, request: ProcessRequest) -> Result<Value, AgentError> {
        let risk_request: RiskFlagRequest = request.parse_input()?;
        debug!(
            agent_id = %request.agent_id,
            attempt = request.attempt,
            resident_id = %risk_request.resident_id,
            "Processing risk flag"
        );
        let result = until_cancelled(&request.cancel, self.run(risk_request)).await?;
        Ok(serde_json::to_value(result)?)
    }
}
