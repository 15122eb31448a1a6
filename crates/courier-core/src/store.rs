//! Persistence collaborator contract
//!
//! The dispatcher hands unsent events to a [`Store`] when a batch exhausts
//! its retries and on disposal, and reads them back on the next init.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::StoreError;
use crate::event::Event;

/// Durable backlog of undelivered events
///
/// Called from the background flush task; failures are logged by the
/// dispatcher and never reach the caller of `track`.
#[async_trait]
pub trait Store: Send + Sync {
    /// Replace the persisted backlog with `events`
    async fn save(&self, events: &[Event]) -> Result<(), StoreError>;

    /// Read the persisted backlog, oldest first
    async fn load(&self) -> Result<Vec<Event>, StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}

/// In-process store; survives dispatcher restarts but not process restarts
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: Mutex<Vec<Event>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current persisted backlog
    pub fn contents(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save(&self, events: &[Event]) -> Result<(), StoreError> {
        *self.events.lock() = events.to_vec();
        Ok(())
    }

    async fn load(&self) -> Result<Vec<Event>, StoreError> {
        Ok(self.events.lock().clone())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.events.lock().clear();
        Ok(())
    }
}
