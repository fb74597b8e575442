use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use writecare_agents::agent::defaults::{RISK_FLAG_AGENT, SMART_ROSTER_AGENT, VOICE_TO_NOTE_AGENT};
use writecare_agents::processor::{AudioInput, LlmAdapter, StructuredPrompt};
use writecare_agents::{AgentError, AgentInvocation, AgentQueue, Priority, ProcessorCatalog};

use super::support::fast_config;

/// Model stand-in answering each task with a fixed value
#[derive(Default)]
struct CannedModel {
    answers: HashMap<&'static str, Value>,
    tasks: Mutex<Vec<String>>,
}

impl CannedModel {
    fn answer(mut self, task: &'static str, value: Value) -> Self {
        self.answers.insert(task, value);
        self
    }
}

#[async_trait]
impl LlmAdapter for CannedModel {
    async fn transcribe(&self, _audio: &AudioInput) -> Result<String, AgentError> {
        self.tasks.lock().push("transcribe".to_string());
        Ok("Arthur was breathless on the stairs this morning".to_string())
    }

    async fn complete_structured(&self, prompt: StructuredPrompt) -> Result<Value, AgentError> {
        self.tasks.lock().push(prompt.task.clone());
        self.answers
            .get(prompt.task.as_str())
            .cloned()
            .ok_or_else(|| AgentError::Adapter(format!("no answer for {}", prompt.task)))
    }
}

fn queue_with_model(model: Arc<CannedModel>) -> AgentQueue {
    let queue = AgentQueue::new(fast_config(), ProcessorCatalog::with_builtins(model));
    assert_eq!(queue.register_defaults().unwrap(), 3);
    queue
}

#[tokio::test(start_paused = true)]
async fn risk_flag_escalates_critical_assessment() {
    let model = Arc::new(CannedModel::default().answer(
        "risk_assessment",
        json!({
            "risk_level": "critical",
            "risk_factors": ["SpO2 below 90%"],
            "recommended_actions": ["Call 111"]
        }),
    ));
    let queue = queue_with_model(Arc::clone(&model));

    let handle = queue.submit(
        AgentInvocation::new(
            RISK_FLAG_AGENT,
            json!({"resident_id": "res-7", "vitals": {"oxygen_saturation": 88.0}}),
        )
        .with_priority(Priority::Urgent),
    );
    queue.tick().await;
    let response = handle.response().await;

    assert!(response.success, "{:?}", response.error);
    let result = response.result.unwrap();
    assert_eq!(result["priority"], json!("urgent"));
    assert_eq!(result["escalate"], json!(true));
    assert_eq!(result["assessment"]["risk_level"], json!("critical"));
}

#[tokio::test(start_paused = true)]
async fn voice_note_from_audio_runs_every_stage() {
    let model = Arc::new(
        CannedModel::default()
            .answer(
                "care_note",
                json!({"summary": "Arthur breathless on stairs", "follow_up_required": true}),
            )
            .answer("sentiment", json!({"label": "negative", "score": -0.4}))
            .answer("entities", json!({"entities": [{"kind": "symptom", "text": "breathless"}]})),
    );
    let queue = queue_with_model(Arc::clone(&model));

    let handle = queue.submit(AgentInvocation::new(
        VOICE_TO_NOTE_AGENT,
        json!({"audio": {"audio_url": "s3://notes/7.wav"}, "resident_id": "res-7"}),
    ));
    queue.tick().await;
    let response = handle.response().await;

    assert!(response.success, "{:?}", response.error);
    let result = response.result.unwrap();
    assert_eq!(result["note"]["follow_up_required"], json!(true));
    assert_eq!(result["sentiment"]["label"], json!("negative"));
    assert_eq!(result["entities"][0]["text"], json!("breathless"));

    let tasks = model.tasks.lock().clone();
    assert_eq!(&tasks[..2], ["transcribe", "care_note"]);
    assert_eq!(tasks.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn malformed_model_output_is_retried_then_reported() {
    let model = Arc::new(
        CannedModel::default().answer("risk_assessment", json!({"risk_level": "somewhat"})),
    );
    let queue = queue_with_model(Arc::clone(&model));

    let handle = queue.submit(AgentInvocation::new(
        RISK_FLAG_AGENT,
        json!({"resident_id": "res-7", "observations": ["confused"]}),
    ));
    queue.tick().await;
    let response = handle.response().await;

    assert!(!response.success);
    assert!(response
        .error
        .unwrap()
        .starts_with("invalid structured output: risk_assessment"));
    // risk-flag allows three retries
    assert_eq!(response.attempts, 4);
    assert_eq!(model.tasks.lock().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn roster_without_staff_fails_without_model_call() {
    let model = Arc::new(CannedModel::default());
    let queue = queue_with_model(Arc::clone(&model));

    let handle = queue.submit(AgentInvocation::new(
        SMART_ROSTER_AGENT,
        json!({
            "period_start": "2026-11-02",
            "period_end": "2026-11-08",
            "staff": [],
            "shifts": []
        }),
    ));
    queue.tick().await;
    let response = handle.response().await;

    assert!(!response.success);
    assert!(response.error.unwrap().starts_with("invalid input"));
    assert_eq!(response.attempts, 1);
    assert!(model.tasks.lock().is_empty());
}
