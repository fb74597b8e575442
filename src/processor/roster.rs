//! Smart roster processor.
//!
//! Staff, shift requirements and free-form constraints are serialized into the prompt;
//! the model answers with assignments and recommendations in a fixed schema. Assignments
//! that reference unknown staff or shifts are rejected as invalid output.

use super::adapter::{parse_structured, LlmAdapter, StructuredPrompt};
use super::{until_cancelled, AgentProcessor, ProcessRequest};
use crate::error::AgentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

const ROSTER_SYSTEM: &str = "You optimise care-home staff rosters. Respect safe staffing levels, \
role requirements, staff availability and maximum hours. Only assign listed staff to listed shifts.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: String,
    pub name: String,
    pub role: String,
    pub max_hours: f32,
    /// Dates (YYYY-MM-DD) the staff member cannot work
    #[serde(default)]
    pub unavailable: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftRequirement {
    pub shift_id: String,
    pub date: String,
    pub start: String,
    pub end: String,
    pub role: String,
    pub required_staff: u32,
}

/// Roster optimisation request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_id: Option<String>,
    pub period_start: String,
    pub period_end: String,
    pub staff: Vec<StaffMember>,
    pub shifts: Vec<ShiftRequirement>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftAssignment {
    pub shift_id: String,
    pub staff_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationImpact {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterRecommendation {
    pub title: String,
    pub detail: String,
    pub impact: RecommendationImpact,
}

/// Structured roster optimisation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterOptimization {
    pub assignments: Vec<ShiftAssignment>,
    #[serde(default)]
    pub recommendations: Vec<RosterRecommendation>,
    #[serde(default)]
    pub unfilled_shifts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost_saving: Option<f64>,
}

pub struct SmartRosterProcessor {
    adapter: Arc<dyn LlmAdapter>,
}

impl SmartRosterProcessor {
    pub fn new(adapter: Arc<dyn LlmAdapter>) -> Self {
        Self { adapter }
    }

    fn validate_request(request: &RosterRequest) -> Result<(), AgentError> {
        if request.staff.is_empty() {
            return Err(AgentError::InvalidInput("roster requires at least one staff member".to_string()));
        }
        if request.shifts.is_empty() {
            return Err(AgentError::InvalidInput("roster requires at least one shift".to_string()));
        }
        Ok(())
    }

    fn build_prompt(request: &RosterRequest) -> Result<StructuredPrompt, AgentError> {
        let constraints = serde_json::to_string_pretty(request)?;
        Ok(StructuredPrompt::new(
            "roster_optimization",
            ROSTER_SYSTEM,
            format!(
                "Produce an optimised roster for {} to {}.\n{}",
                request.period_start, request.period_end, constraints
            ),
            json!({
                "type": "object",
                "required": ["assignments"],
                "properties": {
                    "assignments": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["shift_id", "staff_id"],
                            "properties": {
                                "shift_id": {"type": "string"},
                                "staff_id": {"type": "string"}
                            }
                        }
                    },
                    "recommendations": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["title", "detail", "impact"],
                            "properties": {
                                "title": {"type": "string"},
                                "detail": {"type": "string"},
                                "impact": {"enum": ["high", "medium", "low"]}
                            }
                        }
                    },
                    "unfilled_shifts": {"type": "array", "items": {"type": "string"}},
                    "estimated_cost_saving": {"type": "number"}
                }
            }),
        ))
    }

    /// Reject assignments that reference staff or shifts outside the request.
    fn check_references(request: &RosterRequest, result: &RosterOptimization) -> Result<(), AgentError> {
        let staff: HashSet<&str> = request.staff.iter().map(|s| s.id.as_str()).collect();
        let shifts: HashSet<&str> = request.shifts.iter().map(|s| s.shift_id.as_str()).collect();

        for assignment in &result.assignments {
            if !staff.contains(assignment.staff_id.as_str()) {
                return Err(AgentError::InvalidOutput(format!(
                    "roster_optimization: unknown staff '{}'",
                    assignment.staff_id
                )));
            }
            if !shifts.contains(assignment.shift_id.as_str()) {
                return Err(AgentError::InvalidOutput(format!(
                    "roster_optimization: unknown shift '{}'",
                    assignment.shift_id
                )));
            }
        }
        Ok(())
    }

    async fn run(&self, request: RosterRequest) -> Result<RosterOptimization, AgentError> {
        Self::validate_request(&request)?;
        let prompt = Self::build_prompt(&request)?;
        let result: RosterOptimization = parse_structured(
            "roster_optimization",
            self.adapter.complete_structured(prompt).await?,
        )?;
        Self::check_references(&request, &result)?;
        Ok(result)
    }
}

#[async_trait]
impl AgentProcessor for SmartRosterProcessor {
    async fn process(&self, request: ProcessRequest) -> Result<Value, AgentError> {
        let roster_request: RosterRequest = request.parse_input()?;
        debug!(
            agent_id = %request.agent_id,
            attempt = request.attempt,
            staff = roster_request.staff.len(),
            shifts = roster_request.shifts.len(),
            "Processing roster optimisation"
        );
        let result = until_cancelled(&request.cancel, self.run(roster_request)).await?;
        Ok(serde_json::to_value(result)?)
    }
}
