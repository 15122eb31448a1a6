//! # courier
//!
//! Client-embedded telemetry dispatcher.
//!
//! Application code records events through a [`Client`]; a background
//! [`Dispatcher`] buffers them, sends them in batches through a
//! [`Transport`], retries transient failures with exponential backoff, and
//! hands anything it could not deliver to a [`Store`] so it survives a
//! process restart.
//!
//! ## Guarantees
//!
//! - **Never blocks the producer**: `track` only pushes onto an in-memory
//!   queue; network calls and backoff sleeps happen on background tasks
//! - **Ordered delivery**: batches go out in enqueue order; a batch that
//!   exhausts its retries is put back at the head of the queue and no later
//!   batch is attempted in that pass
//! - **One flush at a time**: concurrent `flush` calls collapse into one pass
//! - **Survives restarts**: unsent events are persisted on dispose and when
//!   retries run out, and restored on the next `init`
//!
//! ## Collaborators
//!
//! Transport, persistence and platform detection are traits
//! ([`Transport`], [`Store`], [`EnvironmentProbe`]); logging goes through
//! `tracing`. Concrete implementations live in `courier-adapters`.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod metadata;
pub mod probe;
pub mod queue;
pub mod retry;
pub mod session;
pub mod store;
pub mod transport;

pub use client::{Client, ClientBuilder, ClientState};
pub use config::{BackoffConfig, Config, DEFAULT_API_KEY_HEADER};
pub use dispatcher::{Dispatcher, DispatcherState, FlushSummary};
pub use error::{ClientError, ConfigError, StoreError, TransportError};
pub use event::{
    BrowserInfo, DeviceInfo, Event, MetadataMap, NamedEvent, OsInfo, Platform, Properties,
    TrackEvent, TrackMetadata,
};
pub use metadata::{merge, MetadataStore};
pub use probe::{EnvironmentProbe, NoPlatform, StaticProbe};
pub use queue::EventQueue;
pub use retry::{Outcome, RetryDecision, RetryPolicy};
pub use store::{MemoryStore, Store};
pub use transport::{batch_headers, BatchBody, Transport, TransportResponse};
