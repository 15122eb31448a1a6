//! Shared collaborator stubs for dispatcher and client tests

#![allow(dead_code)]

use async_trait::async_trait;
use courier_core::{
    BackoffConfig, Config, Event, MemoryStore, Store, StoreError, Transport, TransportError,
    TransportResponse,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Scripted answer for one transport call
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Status(u16),
    Fail,
}

/// Transport replaying a script, recording batches and detecting overlap
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    latency: Duration,
    batches: Mutex<Vec<Vec<Event>>>,
    headers: Mutex<Vec<HashMap<String, String>>>,
    in_flight: AtomicUsize,
    overlaps: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    /// Every call answers with `fallback`
    pub fn always(fallback: Reply) -> Self {
        Self::scripted(Vec::new(), fallback)
    }

    /// Answers from `script` first, then `fallback`
    pub fn scripted(script: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            latency: Duration::ZERO,
            batches: Mutex::new(Vec::new()),
            headers: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            overlaps: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    /// Every batch passed to `send`, including retried ones
    pub fn batches(&self) -> Vec<Vec<Event>> {
        self.batches.lock().clone()
    }

    pub fn last_headers(&self) -> Option<HashMap<String, String>> {
        self.headers.lock().last().cloned()
    }

    /// Event names in the order they were sent, across all calls
    pub fn sent_names(&self) -> Vec<String> {
        self.batches
            .lock()
            .iter()
            .flatten()
            .map(|e| e.name.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        _endpoint: &str,
        events: &[Event],
        headers: &HashMap<String, String>,
    ) -> Result<TransportResponse, TransportError> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.batches.lock().push(events.to_vec());
        self.headers.lock().push(headers.clone());
        let reply = self.script.lock().pop_front().unwrap_or(self.fallback);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match reply {
            Reply::Status(status) => Ok(TransportResponse::new(status, None)),
            Reply::Fail => Err(TransportError::Connect("connection reset".to_string())),
        }
    }
}

/// Store recording every call, optionally failing
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    saves: Mutex<Vec<Vec<Event>>>,
    loads: AtomicUsize,
    clears: AtomicUsize,
    pub fail_load: AtomicBool,
    pub fail_save: AtomicBool,
    pub fail_clear: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that fails every operation
    pub fn broken() -> Self {
        let store = Self::default();
        store.fail_load.store(true, Ordering::SeqCst);
        store.fail_save.store(true, Ordering::SeqCst);
        store.fail_clear.store(true, Ordering::SeqCst);
        store
    }

    pub async fn seed(&self, events: &[Event]) {
        self.inner.save(events).await.unwrap();
    }

    pub fn contents(&self) -> Vec<Event> {
        self.inner.contents()
    }

    pub fn saves(&self) -> Vec<Vec<Event>> {
        self.saves.lock().clone()
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for RecordingStore {
    async fn save(&self, events: &[Event]) -> Result<(), StoreError> {
        self.saves.lock().push(events.to_vec());
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        self.inner.save(events).await
    }

    async fn load(&self) -> Result<Vec<Event>, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("corrupt backlog".to_string()));
        }
        self.inner.load().await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        if self.fail_clear.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read-only".to_string()));
        }
        self.inner.clear().await
    }
}

/// Config with millisecond backoff so retry tests stay fast
pub fn test_config(max_batch_size: usize, max_retries: u32) -> Config {
    Config::new("http://collector.test/v1/events", "test-key")
        .with_max_batch_size(max_batch_size)
        .with_max_retries(max_retries)
        .with_backoff(BackoffConfig {
            base_delay_ms: 1,
            max_jitter_ms: 0,
            max_delay_ms: 5,
        })
}

pub fn events(names: &[&str]) -> Vec<Event> {
    names.iter().map(|name| Event::new(*name)).collect()
}

pub fn names(events: &[Event]) -> Vec<String> {
    events.iter().map(|e| e.name.clone()).collect()
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
