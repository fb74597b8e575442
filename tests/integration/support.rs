//! Shared fixtures: fast queue config, scripted processors and an event recorder.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use writecare_agents::events::AgentEvent;
use writecare_agents::processor::{from_fn, AgentProcessor, ProcessRequest};
use writecare_agents::{AgentDefinition, AgentError, AgentQueue, EventType, ProcessorCatalog, QueueConfig};

/// Millisecond-scale ticks and backoff so paused-time tests stay short
pub fn fast_config() -> QueueConfig {
    QueueConfig {
        tick_interval_ms: 10,
        backoff_base_ms: 10,
        max_backoff_ms: 100,
        ..Default::default()
    }
}

/// Calls made to a processor
#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Returns its input after `delay`
pub fn echo_after(delay: Duration, calls: Calls) -> Arc<dyn AgentProcessor> {
    from_fn(move |request: ProcessRequest| {
        let calls = calls.clone();
        async move {
            calls.hit();
            sleep(delay).await;
            Ok(request.input)
        }
    })
}

/// Always fails with a retryable adapter error
pub fn always_failing(calls: Calls) -> Arc<dyn AgentProcessor> {
    from_fn(move |_request: ProcessRequest| {
        let calls = calls.clone();
        async move {
            calls.hit();
            Err::<Value, _>(AgentError::Adapter("model unavailable".to_string()))
        }
    })
}

/// Never resolves
pub fn never_resolving(calls: Calls) -> Arc<dyn AgentProcessor> {
    from_fn(move |_request: ProcessRequest| {
        let calls = calls.clone();
        async move {
            calls.hit();
            std::future::pending::<Result<Value, AgentError>>().await
        }
    })
}

/// Queue with a single agent `id` of type `id` backed by `processor`
pub fn queue_with(id: &str, processor: Arc<dyn AgentProcessor>, timeout_ms: u64, retries: u32) -> AgentQueue {
    let queue = AgentQueue::new(fast_config(), ProcessorCatalog::new().with(id, processor));
    queue
        .register(
            AgentDefinition::new(id, id)
                .with_timeout_ms(timeout_ms)
                .with_retry_attempts(retries),
        )
        .unwrap();
    queue
}

/// Every event published by a queue, in emission order
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<AgentEvent>>>);

impl EventLog {
    pub fn attach(queue: &AgentQueue) -> Self {
        let log = Self::default();
        for event_type in [
            EventType::Invoked,
            EventType::Completed,
            EventType::Error,
            EventType::Registered,
            EventType::EnabledChanged,
        ] {
            let sink = Arc::clone(&log.0);
            queue.on(event_type, move |event| sink.lock().push(event.clone()));
        }
        log
    }

    pub fn types_for(&self, correlation_id: &str) -> Vec<EventType> {
        self.0
            .lock()
            .iter()
            .filter(|e| e.correlation_id.as_deref() == Some(correlation_id))
            .map(|e| e.event_type)
            .collect()
    }

    pub fn count(&self, event_type: EventType) -> usize {
        self.0
            .lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    pub fn events(&self) -> Vec<AgentEvent> {
        self.0.lock().clone()
    }
}
