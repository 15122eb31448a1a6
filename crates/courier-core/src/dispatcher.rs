//! Event dispatcher: queue management, batching, retry and persistence
//!
//! Producers call [`Dispatcher::enqueue`] from any thread; it never waits on
//! I/O. Delivery happens on background tasks spawned onto the tokio runtime
//! handed to [`Dispatcher::new`]. At most one flush body runs at a time:
//! `flush()` uses a test-and-set flag so concurrent callers collapse into a
//! single scheduled pass, and every pass (scheduled or `flush_sync`)
//! executes under the same async mutex.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{ConfigError, StoreError, TransportError};
use crate::event::Event;
use crate::queue::EventQueue;
use crate::retry::{Outcome, RetryDecision, RetryPolicy};
use crate::store::Store;
use crate::transport::{batch_headers, Transport, TransportResponse};

/// How long `dispose` waits for an in-flight flush and for background tasks
const DISPOSE_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of a [`Dispatcher`]; disposal is one-way
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Active,
    Disposed,
}

/// What one flush pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    /// Events accepted by the collector
    pub sent: usize,
    /// Events rejected with a 4xx and discarded
    pub dropped: usize,
    /// Events put back at the head of the queue after exhausting retries
    pub requeued: usize,
}

/// Result of delivering one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchResult {
    Delivered,
    Dropped,
    Exhausted,
    /// Dispose interrupted the backoff; the batch was not delivered
    Abandoned,
}

/// Owns the event queue and drives batching, retry and persistence
pub struct Dispatcher {
    shared: Arc<Shared>,
    timer: parking_lot::Mutex<Option<JoinHandle<()>>>,
    join_timeout: Duration,
}

struct Shared {
    config: Config,
    policy: RetryPolicy,
    headers: HashMap<String, String>,
    queue: EventQueue,
    transport: Arc<dyn Transport>,
    store: Arc<dyn Store>,
    disposed: AtomicBool,
    flush_scheduled: AtomicBool,
    flush_gate: tokio::sync::Mutex<()>,
    /// Serializes store writes; after dispose holds what the final persist saved
    disposed_backlog: tokio::sync::Mutex<Vec<Event>>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
    runtime: Handle,
}

impl Dispatcher {
    /// Create a dispatcher whose background work runs on `runtime`
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        store: Arc<dyn Store>,
        runtime: Handle,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let shared = Shared {
            policy: RetryPolicy::from_config(&config),
            headers: batch_headers(&config),
            config,
            queue: EventQueue::new(),
            transport,
            store,
            disposed: AtomicBool::new(false),
            flush_scheduled: AtomicBool::new(false),
            flush_gate: tokio::sync::Mutex::new(()),
            disposed_backlog: tokio::sync::Mutex::new(Vec::new()),
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
            runtime,
        };

        Ok(Self {
            shared: Arc::new(shared),
            timer: parking_lot::Mutex::new(None),
            join_timeout: DISPOSE_JOIN_TIMEOUT,
        })
    }

    /// How long `dispose` waits for an in-flight flush and for background tasks
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Queue an event; triggers a background flush once a batch is full
    ///
    /// No-op (logged) once the dispatcher is disposed.
    pub fn enqueue(&self, event: Event) {
        let name = event.name.clone();
        // Checked under the queue lock so a push cannot slip in after dispose drains
        let queue_size = match self.shared.queue.push_unless(event, &self.shared.disposed) {
            Ok(queue_size) => queue_size,
            Err(event) => {
                warn!(event = %event.name, "dispatcher is disposed, rejecting event");
                return;
            }
        };
        debug!(event = %name, queue_size, "event enqueued");

        if queue_size >= self.shared.config.max_batch_size {
            self.shared.trigger_flush();
        }
    }

    /// Schedule a flush pass on the background runtime and return immediately
    ///
    /// No-op while another background pass is scheduled or running. A pass
    /// started by [`Dispatcher::flush_sync`] does not count: the new pass
    /// waits for it to finish and then runs.
    pub fn flush(&self) {
        self.shared.trigger_flush();
    }

    /// Run a flush pass and wait for it to finish
    ///
    /// Waits behind any pass that is currently executing.
    pub async fn flush_sync(&self) -> FlushSummary {
        if self.is_disposed() {
            return FlushSummary::default();
        }
        self.shared.flush_pass().await
    }

    /// Append previously persisted events to the queue, oldest first
    pub async fn restore(&self) -> Result<usize, StoreError> {
        if self.is_disposed() {
            return Ok(0);
        }

        let events = self.shared.store.load().await?;
        let count = events.len();
        if count > 0 {
            let queue_size = self.shared.queue.extend(events);
            info!(count, queue_size, "restored persisted events");
        }
        Ok(count)
    }

    /// Start the recurring flush timer; calling it again is a no-op
    pub fn start_scheduled_flush(&self) {
        if self.is_disposed() {
            return;
        }

        let mut timer = self.timer.lock();
        if timer.is_some() {
            debug!("scheduled flush already running");
            return;
        }

        let shared = Arc::clone(&self.shared);
        let period = shared.config.flush_interval();
        let handle = self.shared.tasks.spawn_on(
            async move {
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = shared.shutdown.cancelled() => break,
                        _ = ticker.tick() => {
                            if !shared.queue.is_empty() {
                                shared.trigger_flush();
                            }
                        }
                    }
                }
                debug!("scheduled flush stopped");
            },
            &self.shared.runtime,
        );
        *timer = Some(handle);

        debug!(interval_ms = self.shared.config.flush_interval_ms, "scheduled flush started");
    }

    /// Stop background work and persist whatever is still queued
    ///
    /// Idempotent and one-way. An in-flight transport call is allowed to
    /// finish; a pending backoff sleep is cut short and its batch goes back
    /// to the queue before the final persist. A pass that outlives the join
    /// timeout adds any batch it failed to deliver to the persisted backlog
    /// and never clears it.
    pub async fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        debug!("disposing dispatcher");
        self.shared.shutdown.cancel();
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }

        let gate = tokio::time::timeout(self.join_timeout, self.shared.flush_gate.lock()).await;
        if gate.is_err() {
            warn!("in-flight flush did not finish in time, persisting current queue");
        }
        self.shared.persist_backlog().await;
        drop(gate);

        self.shared.tasks.close();
        if tokio::time::timeout(self.join_timeout, self.shared.tasks.wait())
            .await
            .is_err()
        {
            warn!("background tasks did not stop within timeout");
        }
    }

    /// Number of events waiting to be sent
    pub fn queue_size(&self) -> usize {
        self.shared.queue.len()
    }

    /// Current lifecycle state
    pub fn state(&self) -> DispatcherState {
        if self.is_disposed() {
            DispatcherState::Disposed
        } else {
            DispatcherState::Active
        }
    }

    /// Whether `dispose` has been called
    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Stop the timer even when dispose() was never awaited
        self.shared.shutdown.cancel();
    }
}

impl Shared {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn trigger_flush(self: &Arc<Self>) {
        if self.is_disposed() {
            debug!("dispatcher is disposed, skipping flush");
            return;
        }

        if self
            .flush_scheduled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("flush already in progress, skipping");
            return;
        }

        let shared = Arc::clone(self);
        self.tasks.spawn_on(
            async move {
                shared.flush_pass().await;
                shared.flush_scheduled.store(false, Ordering::Release);
            },
            &self.runtime,
        );
    }

    async fn flush_pass(&self) -> FlushSummary {
        let _gate = self.flush_gate.lock().await;
        self.flush_body().await
    }

    async fn flush_body(&self) -> FlushSummary {
        let mut summary = FlushSummary::default();

        while !self.is_disposed() {
            let batch = self.queue.pop_up_to(self.config.max_batch_size);
            if batch.is_empty() {
                break;
            }

            let batch_size = batch.len();
            match self.deliver(&batch).await {
                BatchResult::Delivered => summary.sent += batch_size,
                BatchResult::Dropped => summary.dropped += batch_size,
                BatchResult::Exhausted => {
                    self.queue.push_front(batch);
                    summary.requeued += batch_size;
                    self.persist_backlog().await;
                    // Later batches stay queued so delivery order is preserved
                    return summary;
                }
                BatchResult::Abandoned => {
                    self.queue.push_front(batch);
                    if self.is_disposed() {
                        self.persist_backlog().await;
                    }
                    return summary;
                }
            }
        }

        if summary.sent + summary.dropped > 0 {
            self.clear_backlog().await;
        }

        if summary != FlushSummary::default() {
            info!(sent = summary.sent, dropped = summary.dropped, "flush finished");
        }
        summary
    }

    async fn deliver(&self, batch: &[Event]) -> BatchResult {
        let mut attempt = 1;
        loop {
            let result = self
                .transport
                .send(&self.config.endpoint, batch, &self.headers)
                .await;

            match self.policy.decide(attempt, Outcome::classify(&result)) {
                RetryDecision::Delivered => {
                    debug!(batch_size = batch.len(), attempt, "batch delivered");
                    return BatchResult::Delivered;
                }
                RetryDecision::Drop => {
                    warn!(
                        batch_size = batch.len(),
                        result = %describe(&result),
                        "collector rejected batch, dropping without retry"
                    );
                    return BatchResult::Dropped;
                }
                RetryDecision::Retry { delay } => {
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        result = %describe(&result),
                        "send attempt failed, retrying"
                    );
                    tokio::select! {
                        _ = self.shutdown.cancelled() => return BatchResult::Abandoned,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                RetryDecision::GiveUp => {
                    error!(
                        attempts = attempt,
                        batch_size = batch.len(),
                        result = %describe(&result),
                        "retries exhausted, requeueing batch"
                    );
                    return BatchResult::Exhausted;
                }
            }
        }
    }

    /// Write unsent events to the store
    ///
    /// While active the store mirrors the queue. Once disposed the queue is
    /// drained instead, and its events are saved ahead of whatever the
    /// final persist already wrote, so a late pass never shrinks the backlog.
    async fn persist_backlog(&self) {
        let mut saved = self.disposed_backlog.lock().await;

        if !self.is_disposed() {
            let snapshot = self.queue.snapshot();
            if let Err(e) = self.store.save(&snapshot).await {
                error!(error = %e, count = snapshot.len(), "failed to persist queued events");
            }
            return;
        }

        let late = self.queue.drain_all();
        if late.is_empty() {
            return;
        }
        let count = late.len();
        let mut backlog = late;
        backlog.extend(saved.iter().cloned());

        match self.store.save(&backlog).await {
            Ok(()) => {
                info!(count, total = backlog.len(), "persisted events on dispose");
                *saved = backlog;
            }
            Err(e) => error!(error = %e, count, "failed to persist events on dispose"),
        }
    }

    /// Clear the store once everything queued has been delivered or dropped
    async fn clear_backlog(&self) {
        let _saved = self.disposed_backlog.lock().await;
        if self.is_disposed() || !self.queue.is_empty() {
            return;
        }
        if let Err(e) = self.store.clear().await {
            error!(error = %e, "failed to clear persisted events");
        }
    }
}

fn describe(result: &Result<TransportResponse, TransportError>) -> String {
    match result {
        Ok(response) => format!("status {}", response.status),
        Err(e) => e.to_string(),
    }
}
