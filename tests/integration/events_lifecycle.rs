use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use writecare_agents::{AgentDefinition, AgentInvocation, AgentQueue, EventType, ProcessorCatalog};

use super::support::{always_failing, echo_after, fast_config, queue_with, Calls, EventLog};

#[tokio::test(start_paused = true)]
async fn success_emits_invoked_then_completed() {
    let queue = queue_with("echo", echo_after(Duration::from_millis(5), Calls::default()), 100, 0);
    let events = EventLog::attach(&queue);

    let handle = queue.submit(AgentInvocation::new("echo", json!("hi")));
    let correlation_id = handle.correlation_id().to_string();
    queue.tick().await;
    handle.response().await;

    assert_eq!(
        events.types_for(&correlation_id),
        vec![EventType::Invoked, EventType::Completed]
    );
    let completed = events
        .events()
        .into_iter()
        .find(|e| e.event_type == EventType::Completed)
        .unwrap();
    assert_eq!(completed.agent_id, "echo");
    assert_eq!(completed.payload["attempts"], json!(1));
    assert!(completed.payload["processing_time_ms"].as_u64().unwrap() >= 5);
}

#[tokio::test(start_paused = true)]
async fn failure_emits_invoked_then_error_once() {
    let queue = queue_with("broken", always_failing(Calls::default()), 100, 2);
    let events = EventLog::attach(&queue);

    let handle = queue.submit(AgentInvocation::new("broken", Value::Null).with_correlation_id("c-1"));
    queue.tick().await;
    handle.response().await;

    // Retries are internal to one invocation
    assert_eq!(
        events.types_for("c-1"),
        vec![EventType::Invoked, EventType::Error]
    );
    let error = events
        .events()
        .into_iter()
        .find(|e| e.event_type == EventType::Error)
        .unwrap();
    assert_eq!(error.payload["attempts"], json!(3));
    assert!(error.payload["error"].as_str().unwrap().contains("model unavailable"));
}

#[tokio::test(start_paused = true)]
async fn rejected_invocation_emits_error_without_invoked() {
    let queue = queue_with("echo", echo_after(Duration::ZERO, Calls::default()), 100, 0);
    let events = EventLog::attach(&queue);
    queue.set_agent_enabled("echo", false).unwrap();

    let response = queue
        .invoke(AgentInvocation::new("echo", Value::Null).with_correlation_id("c-9"))
        .await;

    assert!(!response.success);
    assert_eq!(events.types_for("c-9"), vec![EventType::Error]);
    assert_eq!(events.count(EventType::EnabledChanged), 1);
}

#[tokio::test(start_paused = true)]
async fn registration_and_toggle_events_carry_agent_id() {
    let queue = AgentQueue::new(
        fast_config(),
        ProcessorCatalog::new().with("echo", echo_after(Duration::ZERO, Calls::default())),
    );
    let events = EventLog::attach(&queue);

    queue
        .register(AgentDefinition::new("echo", "echo").with_capabilities(["echo"]))
        .unwrap();
    queue.set_agent_enabled("echo", false).unwrap();

    let recorded = events.events();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].event_type, EventType::Registered);
    assert_eq!(recorded[0].payload["capabilities"], json!(["echo"]));
    assert_eq!(recorded[1].event_type, EventType::EnabledChanged);
    assert_eq!(recorded[1].agent_id, "echo");
    assert_eq!(recorded[1].payload, json!({"enabled": false, "previous": true}));
}

#[tokio::test(start_paused = true)]
async fn removed_listener_stops_receiving() {
    let queue = queue_with("echo", echo_after(Duration::ZERO, Calls::default()), 100, 0);
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let id = queue.on(EventType::Completed, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let first = queue.submit(AgentInvocation::new("echo", Value::Null));
    queue.tick().await;
    first.response().await;
    assert!(queue.off(id));
    assert!(!queue.off(id));

    let second = queue.submit(AgentInvocation::new("echo", Value::Null));
    queue.tick().await;
    second.response().await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn subscriber_receives_events_in_order() {
    let queue = queue_with("echo", echo_after(Duration::ZERO, Calls::default()), 100, 0);
    let mut receiver = queue.subscribe();

    let handle = queue.submit(AgentInvocation::new("echo", Value::Null));
    queue.tick().await;
    handle.response().await;

    let invoked = receiver.recv().await.unwrap();
    let completed = receiver.recv().await.unwrap();
    assert_eq!(invoked.event_type, EventType::Invoked);
    assert_eq!(completed.event_type, EventType::Completed);
    assert_eq!(invoked.correlation_id, completed.correlation_id);
    assert!(completed.timestamp >= invoked.timestamp);
}
