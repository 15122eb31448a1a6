//! Main telemetry client
//!
//! Owns the lifecycle (`init` / `dispose`), stamps events with session,
//! platform, timestamp and merged metadata, and forwards them to a
//! [`Dispatcher`]. A disposed client may be initialized again; that builds a
//! fresh dispatcher and a fresh session id.

use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::config::Config;
use crate::dispatcher::{Dispatcher, FlushSummary};
use crate::error::{ClientError, ConfigError};
use crate::event::{Event, Properties, TrackEvent, TrackMetadata};
use crate::metadata::{merge, MetadataStore};
use crate::probe::{EnvironmentProbe, NoPlatform};
use crate::session::generate_session_id;
use crate::store::{MemoryStore, Store};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Initialized,
    Disposed,
}

/// Main telemetry client
///
/// All methods take `&self` and are safe to call from any thread; share the
/// client through an `Arc`.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use courier_core::{Client, Config, Transport};
/// # async fn example(transport: Arc<dyn Transport>) -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::builder(Config::new("https://collect.example.com/v1/events", "key"), transport)
///     .build()?;
/// client.init().await?;
/// client.set_metadata("user_id", "12345");
/// client.track("button_clicked", None, None)?;
/// client.dispose().await;
/// # Ok(())
/// # }
/// ```
pub struct Client {
    config: Config,
    transport: Arc<dyn Transport>,
    store: Arc<dyn Store>,
    probe: Arc<dyn EnvironmentProbe>,
    metadata: MetadataStore,
    lifecycle: tokio::sync::Mutex<()>,
    inner: RwLock<Inner>,
}

struct Inner {
    state: ClientState,
    dispatcher: Option<Arc<Dispatcher>>,
    session_id: Option<String>,
}

/// Builder wiring a [`Client`] to its collaborators
pub struct ClientBuilder {
    config: Config,
    transport: Arc<dyn Transport>,
    store: Option<Arc<dyn Store>>,
    probe: Option<Arc<dyn EnvironmentProbe>>,
    session_id: Option<String>,
}

impl ClientBuilder {
    /// Persistence backend (default: [`MemoryStore`])
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Platform source (default: [`NoPlatform`])
    pub fn probe(mut self, probe: Arc<dyn EnvironmentProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Reuse an existing session id for the first `init()`
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn build(self) -> Result<Client, ConfigError> {
        self.config.validate()?;
        Ok(Client {
            config: self.config,
            transport: self.transport,
            store: self.store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
            probe: self.probe.unwrap_or_else(|| Arc::new(NoPlatform)),
            metadata: MetadataStore::new(),
            lifecycle: tokio::sync::Mutex::new(()),
            inner: RwLock::new(Inner {
                state: ClientState::Uninitialized,
                dispatcher: None,
                session_id: self.session_id,
            }),
        })
    }
}

impl Client {
    pub fn builder(config: Config, transport: Arc<dyn Transport>) -> ClientBuilder {
        ClientBuilder {
            config,
            transport,
            store: None,
            probe: None,
            session_id: None,
        }
    }

    /// Initialize the client
    ///
    /// Restores persisted events and starts the scheduled flush. Concurrent
    /// and repeated calls are no-ops once initialized. A failing store only
    /// costs the backlog: the client still comes up with an empty queue.
    pub async fn init(&self) -> Result<(), ConfigError> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.inner.read().state == ClientState::Initialized {
            return Ok(());
        }

        let session_id = self
            .inner
            .read()
            .session_id
            .clone()
            .unwrap_or_else(generate_session_id);

        let dispatcher = Arc::new(Dispatcher::new(
            self.config.clone(),
            Arc::clone(&self.transport),
            Arc::clone(&self.store),
            Handle::current(),
        )?);

        if let Err(e) = dispatcher.restore().await {
            warn!(error = %e, "failed to restore persisted events, continuing with empty queue");
        }
        dispatcher.start_scheduled_flush();

        {
            let mut inner = self.inner.write();
            inner.dispatcher = Some(dispatcher);
            inner.session_id = Some(session_id.clone());
            inner.state = ClientState::Initialized;
        }

        info!(session_id = %session_id, "client initialized");
        Ok(())
    }

    /// Track an event
    ///
    /// Returns immediately; delivery happens in the background.
    pub fn track(
        &self,
        name: impl Into<String>,
        payload: Option<Properties>,
        metadata: Option<Properties>,
    ) -> Result<(), ClientError> {
        let (dispatcher, session_id) = {
            let inner = self.inner.read();
            match (&inner.state, &inner.dispatcher) {
                (ClientState::Initialized, Some(dispatcher)) => {
                    (Arc::clone(dispatcher), inner.session_id.clone())
                }
                _ => return Err(ClientError::NotInitialized),
            }
        };

        let event = Event {
            name: name.into(),
            payload,
            issued_at: chrono::Utc::now().timestamp_millis(),
            metadata: merge(&self.metadata.get_all(), metadata.as_ref()),
            session_id,
            platform: self.probe.platform(),
        };

        dispatcher.enqueue(event);
        Ok(())
    }

    /// Track a strongly-typed event
    pub fn track_event<E: TrackEvent + ?Sized>(
        &self,
        event: &E,
        metadata: Option<&dyn TrackMetadata>,
    ) -> Result<(), ClientError> {
        self.track(
            event.name(),
            event.to_payload(),
            metadata.map(|m| m.to_map()),
        )
    }

    /// Set a global metadata value attached to all subsequent events
    pub fn set_metadata(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.set(key, value);
    }

    /// Set every entry of a strongly-typed metadata value
    pub fn set_typed_metadata<M: TrackMetadata + ?Sized>(&self, metadata: &M) {
        self.metadata.set_all(metadata.to_map());
    }

    pub fn remove_metadata(&self, key: &str) {
        self.metadata.remove(key);
    }

    pub fn clear_metadata(&self) {
        self.metadata.clear();
    }

    /// Snapshot of the global metadata
    pub fn get_metadata(&self) -> Properties {
        self.metadata.get_all()
    }

    /// Schedule a background flush; no-op when not initialized
    pub fn flush(&self) {
        if let Some(dispatcher) = self.dispatcher() {
            dispatcher.flush();
        }
    }

    /// Flush and wait for the pass to finish; no-op when not initialized
    pub async fn flush_sync(&self) -> FlushSummary {
        match self.dispatcher() {
            Some(dispatcher) => dispatcher.flush_sync().await,
            None => FlushSummary::default(),
        }
    }

    /// Number of events waiting to be sent
    pub fn queue_size(&self) -> usize {
        self.dispatcher().map_or(0, |d| d.queue_size())
    }

    /// Current session id; `None` unless initialized
    pub fn session_id(&self) -> Option<String> {
        let inner = self.inner.read();
        match inner.state {
            ClientState::Initialized => inner.session_id.clone(),
            _ => None,
        }
    }

    pub fn state(&self) -> ClientState {
        self.inner.read().state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Tear down the dispatcher, persisting unsent events
    ///
    /// Clears global metadata and the session id. Idempotent; the client can
    /// be initialized again afterwards.
    pub async fn dispose(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        let dispatcher = {
            let mut inner = self.inner.write();
            if inner.state != ClientState::Initialized {
                return;
            }
            inner.state = ClientState::Disposed;
            inner.session_id = None;
            inner.dispatcher.take()
        };

        if let Some(dispatcher) = dispatcher {
            dispatcher.dispose().await;
        }
        self.metadata.clear();
        info!("client disposed");
    }

    fn dispatcher(&self) -> Option<Arc<Dispatcher>> {
        let inner = self.inner.read();
        match inner.state {
            ClientState::Initialized => inner.dispatcher.clone(),
            _ => None,
        }
    }
}
