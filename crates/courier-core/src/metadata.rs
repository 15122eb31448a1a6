//! Global metadata attached to every tracked event

use parking_lot::RwLock;
use serde_json::Value;

use crate::event::Properties;

/// Thread-safe map of global tags
///
/// Mutated only through `set`/`remove`/`clear`; reads go through
/// [`MetadataStore::get_all`], which copies the map under the lock so a
/// concurrent writer can never produce a torn read.
#[derive(Debug, Default)]
pub struct MetadataStore {
    inner: RwLock<Properties>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner.write().insert(key.into(), value.into());
    }

    /// Insert every entry of `values`, overwriting existing keys
    pub fn set_all(&self, values: Properties) {
        self.inner.write().extend(values);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.write().remove(key)
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Atomic snapshot of all entries
    pub fn get_all(&self) -> Properties {
        self.inner.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Merge global metadata with event-level metadata
///
/// Event keys win on collision. Returns `None` when both sides are empty.
pub fn merge(global: &Properties, event: Option<&Properties>) -> Option<Properties> {
    let event = event.filter(|m| !m.is_empty());
    match (global.is_empty(), event) {
        (true, None) => None,
        (true, Some(event)) => Some(event.clone()),
        (false, None) => Some(global.clone()),
        (false, Some(event)) => {
            let mut merged = global.clone();
            merged.extend(event.iter().map(|(k, v)| (k.clone(), v.clone())));
            Some(merged)
        }
    }
}
