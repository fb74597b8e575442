//! Dispatch loop and queue handle.

use super::retry::{call_with_retry, RetryPolicy};
use super::{AgentInvocation, AgentResponse, QueueConfig, QueueStats};
use crate::agent::{default_definitions, AgentDefinition, AgentRegistry, AgentStatus};
use crate::config::AppConfig;
use crate::error::AgentError;
use crate::events::{AgentEvent, EventBus, EventType, ListenerId};
use crate::processor::{ProcessRequest, ProcessorCatalog};
use crate::types::{new_correlation_id, AgentId, CorrelationId};
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Queued invocation awaiting dispatch
struct PendingInvocation {
    invocation: AgentInvocation,
    /// Arrival order; breaks priority ties
    sequence: u64,
    enqueued_at: Instant,
    reply: oneshot::Sender<AgentResponse>,
}

/// Stable-sort the whole pending list by priority and remove the first `batch_size` entries.
fn take_batch(pending: &mut Vec<PendingInvocation>, batch_size: usize) -> Vec<PendingInvocation> {
    pending.sort_by_key(|p| (p.invocation.priority.rank(), p.sequence));
    let count = batch_size.min(pending.len());
    pending.drain(..count).collect()
}

/// Resets the single-flight flag when a tick ends, including on panic
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Resolves to the response of a submitted invocation
pub struct InvocationHandle {
    agent_id: AgentId,
    correlation_id: CorrelationId,
    receiver: oneshot::Receiver<AgentResponse>,
}

impl InvocationHandle {
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Wait for the invocation to settle.
    ///
    /// If the queue is dropped before dispatching, resolves to a failed response.
    pub async fn response(self) -> AgentResponse {
        match self.receiver.await {
            Ok(response) => response,
            Err(_) => AgentResponse::failed(
                self.agent_id,
                &AgentError::QueueStopped,
                0,
                0,
                Some(self.correlation_id),
            ),
        }
    }
}

struct QueueShared {
    registry: AgentRegistry,
    events: Arc<EventBus>,
    config: QueueConfig,
    pending: Mutex<Vec<PendingInvocation>>,
    /// Single-flight guard: at most one batch in flight
    processing: AtomicBool,
    /// Cleared by `stop` while holding the pending lock
    accepting: AtomicBool,
    sequence: AtomicU64,
    stats: RwLock<QueueStats>,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QueueShared {
    /// One dispatch round. Returns the number of invocations dispatched.
    async fn tick(&self) -> usize {
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return 0;
        }
        let _guard = ProcessingGuard(&self.processing);

        // `stats.pending` only changes under the pending lock
        let (batch, remaining) = {
            let mut pending = self.pending.lock();
            let batch = take_batch(&mut pending, self.config.batch_size);
            if !batch.is_empty() {
                let mut stats = self.stats.write();
                stats.pending = pending.len();
                stats.processing += batch.len();
            }
            (batch, pending.len())
        };
        if batch.is_empty() {
            return 0;
        }

        let count = batch.len();
        debug!(batch_size = count, remaining, "Dispatching invocation batch");

        join_all(batch.into_iter().map(|pending| self.dispatch(pending))).await;
        count
    }

    async fn dispatch(&self, pending: PendingInvocation) {
        let PendingInvocation {
            invocation,
            enqueued_at,
            reply,
            ..
        } = pending;
        let agent_id = invocation.agent_id.clone();
        let correlation_id = invocation.correlation_id.clone();

        self.events.emit(
            AgentEvent::new(
                EventType::Invoked,
                agent_id.as_str(),
                json!({
                    "priority": invocation.priority,
                    "queued_ms": enqueued_at.elapsed().as_millis() as u64,
                }),
            )
            .with_correlation(correlation_id.clone()),
        );

        let started = Instant::now();
        let (result, attempts) = match self.registry.begin_invocation(&agent_id) {
            Err(err) => (Err(err), 0),
            Ok((definition, processor)) => {
                let policy = self.retry_policy(&definition, invocation.timeout_ms);
                let outcome = call_with_retry(&agent_id, &policy, &self.shutdown, |attempt, cancel| {
                    let processor = Arc::clone(&processor);
                    let request = ProcessRequest {
                        agent_id: agent_id.clone(),
                        input: invocation.input.clone(),
                        context: invocation.context.clone(),
                        correlation_id: correlation_id.clone(),
                        attempt,
                        cancel,
                    };
                    async move { processor.process(request).await }
                })
                .await;
                self.registry
                    .finish_invocation(&agent_id, outcome.result.as_ref().err());
                (outcome.result, outcome.attempts)
            }
        };
        let processing_time_ms = started.elapsed().as_millis() as u64;

        {
            let mut stats = self.stats.write();
            stats.processing = stats.processing.saturating_sub(1);
        }

        let response = match result {
            Ok(value) => {
                info!(
                    agent_id = %agent_id,
                    attempts,
                    duration_ms = processing_time_ms,
                    "Agent invocation completed"
                );
                AgentResponse::succeeded(
                    agent_id.as_str(),
                    value,
                    processing_time_ms,
                    attempts,
                    correlation_id,
                )
            }
            Err(err) => {
                error!(
                    agent_id = %agent_id,
                    attempts,
                    error = %err,
                    "Agent invocation failed"
                );
                AgentResponse::failed(
                    agent_id.as_str(),
                    &err,
                    processing_time_ms,
                    attempts,
                    correlation_id,
                )
            }
        };
        self.settle(response, reply);
    }

    fn retry_policy(&self, definition: &AgentDefinition, timeout_override: Option<u64>) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(timeout_override.unwrap_or(definition.timeout_ms)),
            retry_attempts: definition.retry_attempts,
            backoff_base: Duration::from_millis(self.config.backoff_base_ms),
            max_backoff: Duration::from_millis(self.config.max_backoff_ms),
        }
    }

    /// Fail an invocation that never reaches dispatch
    fn reject(&self, invocation: AgentInvocation, err: AgentError, reply: oneshot::Sender<AgentResponse>) {
        warn!(
            agent_id = %invocation.agent_id,
            error = %err,
            "Rejected agent invocation"
        );
        let response = AgentResponse::failed(
            invocation.agent_id,
            &err,
            0,
            0,
            invocation.correlation_id,
        );
        self.settle(response, reply);
    }

    /// Record, publish and deliver a final response
    fn settle(&self, response: AgentResponse, reply: oneshot::Sender<AgentResponse>) {
        {
            let mut stats = self.stats.write();
            if response.success {
                stats.completed += 1;
            } else {
                stats.failed += 1;
            }
        }

        let event = if response.success {
            AgentEvent::new(
                EventType::Completed,
                response.agent_id.as_str(),
                json!({
                    "processing_time_ms": response.processing_time_ms,
                    "attempts": response.attempts,
                }),
            )
        } else {
            AgentEvent::new(
                EventType::Error,
                response.agent_id.as_str(),
                json!({
                    "error": response.error,
                    "processing_time_ms": response.processing_time_ms,
                    "attempts": response.attempts,
                }),
            )
        };
        self.events
            .emit(event.with_correlation(response.correlation_id.clone()));

        if reply.send(response).is_err() {
            debug!("Invocation caller went away before the response was ready");
        }
    }
}

/// Dispatch loop body. Holds only a weak reference so dropping every queue handle ends it.
async fn run_loop(shared: Weak<QueueShared>, shutdown: CancellationToken, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let Some(shared) = shared.upgrade() else { break };
                shared.tick().await;
            }
        }
    }
    debug!("Dispatch loop stopped");
}

/// Agent invocation queue
///
/// Cheap to clone; all clones share one registry, event bus and pending list.
#[derive(Clone)]
pub struct AgentQueue {
    shared: Arc<QueueShared>,
}

impl AgentQueue {
    /// Create a stopped queue with an empty registry
    pub fn new(config: QueueConfig, catalog: ProcessorCatalog) -> Self {
        let events = Arc::new(EventBus::new(config.event_capacity));
        let registry = AgentRegistry::new(catalog, Arc::clone(&events));
        Self {
            shared: Arc::new(QueueShared {
                registry,
                events,
                config,
                pending: Mutex::new(Vec::new()),
                processing: AtomicBool::new(false),
                accepting: AtomicBool::new(true),
                sequence: AtomicU64::new(0),
                stats: RwLock::new(QueueStats::default()),
                shutdown: CancellationToken::new(),
                worker: Mutex::new(None),
            }),
        }
    }

    /// Validate `config`, then register the built-in agents overlaid by configured ones.
    pub fn from_config(config: &AppConfig, catalog: ProcessorCatalog) -> Result<Self, AgentError> {
        config.validate()?;
        let queue = Self::new(config.queue.clone(), catalog);
        queue.register_defaults()?;
        queue.shared.registry.load_from_config(&config.agents)?;
        Ok(queue)
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.shared.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    /// Register the built-in care agents
    pub fn register_defaults(&self) -> Result<usize, AgentError> {
        self.shared.registry.register_all(default_definitions())
    }

    pub fn register(&self, definition: AgentDefinition) -> Result<(), AgentError> {
        self.shared.registry.register(definition)
    }

    pub fn set_agent_enabled(&self, agent_id: &str, enabled: bool) -> Result<(), AgentError> {
        self.shared.registry.set_enabled(agent_id, enabled)
    }

    pub fn get_status(&self, agent_id: &str) -> Result<AgentStatus, AgentError> {
        self.shared.registry.get_status(agent_id)
    }

    pub fn on<F>(&self, event_type: EventType, listener: F) -> ListenerId
    where
        F: Fn(&AgentEvent) + Send + Sync + 'static,
    {
        self.shared.events.on(event_type, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.shared.events.off(id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.shared.events.subscribe()
    }

    /// Start the background dispatch loop. Must be called inside a Tokio runtime.
    pub fn start(&self) -> Result<(), AgentError> {
        if self.shared.shutdown.is_cancelled() {
            return Err(AgentError::QueueStopped);
        }
        let mut worker = self.shared.worker.lock();
        if worker.is_some() {
            return Ok(()); // Already running
        }

        let handle = tokio::spawn(run_loop(
            Arc::downgrade(&self.shared),
            self.shared.shutdown.clone(),
            self.shared.config.tick_interval(),
        ));
        *worker = Some(handle);

        info!(
            tick_interval_ms = self.shared.config.tick_interval_ms,
            batch_size = self.shared.config.batch_size,
            "Started agent queue dispatch loop"
        );
        Ok(())
    }

    /// Stop the dispatch loop, cancel in-flight attempts and fail everything still queued.
    pub async fn stop(&self) {
        let drained = {
            let mut pending = self.shared.pending.lock();
            self.shared.accepting.store(false, Ordering::Release);
            self.shared.stats.write().pending = 0;
            std::mem::take(&mut *pending)
        };
        self.shared.shutdown.cancel();

        let handle = self.shared.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Dispatch loop ended abnormally");
            }
        }

        let count = drained.len();
        for pending in drained {
            self.shared
                .reject(pending.invocation, AgentError::QueueStopped, pending.reply);
        }

        info!(drained = count, "Stopped agent queue");
    }

    pub fn is_running(&self) -> bool {
        self.shared.worker.lock().is_some() && !self.shared.shutdown.is_cancelled()
    }

    /// Enqueue an invocation without waiting for it.
    ///
    /// Unknown or disabled agents, and a stopped queue, resolve the handle immediately with
    /// a failed response; the processor is never called.
    pub fn submit(&self, mut invocation: AgentInvocation) -> InvocationHandle {
        let correlation_id = invocation
            .correlation_id
            .get_or_insert_with(new_correlation_id)
            .clone();
        let (reply, receiver) = oneshot::channel();
        let handle = InvocationHandle {
            agent_id: invocation.agent_id.clone(),
            correlation_id,
            receiver,
        };

        if let Err(err) = self.shared.registry.check_available(&invocation.agent_id) {
            self.shared.reject(invocation, err, reply);
            return handle;
        }

        let mut pending = self.shared.pending.lock();
        if !self.shared.accepting.load(Ordering::Acquire) {
            drop(pending);
            self.shared.reject(invocation, AgentError::QueueStopped, reply);
            return handle;
        }

        debug!(
            agent_id = %invocation.agent_id,
            priority = %invocation.priority,
            queue_size = pending.len() + 1,
            "Enqueued agent invocation"
        );
        pending.push(PendingInvocation {
            invocation,
            sequence: self.shared.sequence.fetch_add(1, Ordering::Relaxed),
            enqueued_at: Instant::now(),
            reply,
        });
        self.shared.stats.write().pending = pending.len();
        drop(pending);

        handle
    }

    /// Enqueue an invocation and wait for its response
    pub async fn invoke(&self, invocation: AgentInvocation) -> AgentResponse {
        self.submit(invocation).response().await
    }

    /// Run one dispatch round now. Returns 0 if a round is already in flight.
    pub async fn tick(&self) -> usize {
        self.shared.tick().await
    }

    pub fn pending_len(&self) -> usize {
        self.shared.pending.lock().len()
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.stats.read().clone()
    }

    /// Wait until nothing is queued or in flight. Returns false on timeout.
    pub async fn wait_for_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let idle = self.pending_len() == 0 && !self.shared.processing.load(Ordering::Acquire);
            if idle {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(Duration::from_millis(10)).await;
        }
    }
}
