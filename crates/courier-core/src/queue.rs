//! FIFO buffer of pending events

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::event::Event;

/// Ordered, thread-safe, unbounded buffer of pending events
///
/// A single lock guards the deque. No operation blocks on anything else.
#[derive(Debug, Default)]
pub struct EventQueue {
    inner: Mutex<VecDeque<Event>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the tail and return the resulting size
    pub fn push(&self, event: Event) -> usize {
        let mut queue = self.inner.lock();
        queue.push_back(event);
        queue.len()
    }

    /// Append at the tail unless `closed` is set, checked under the lock
    ///
    /// Hands the event back when the queue is closed.
    pub fn push_unless(&self, event: Event, closed: &AtomicBool) -> Result<usize, Event> {
        let mut queue = self.inner.lock();
        if closed.load(Ordering::Acquire) {
            return Err(event);
        }
        queue.push_back(event);
        Ok(queue.len())
    }

    /// Append several events at the tail, keeping their order
    pub fn extend(&self, events: impl IntoIterator<Item = Event>) -> usize {
        let mut queue = self.inner.lock();
        queue.extend(events);
        queue.len()
    }

    /// Remove up to `limit` events from the head, oldest first
    pub fn pop_up_to(&self, limit: usize) -> Vec<Event> {
        let mut queue = self.inner.lock();
        let take = limit.min(queue.len());
        queue.drain(..take).collect()
    }

    /// Reinsert a whole batch at the head, ahead of anything queued since
    pub fn push_front(&self, batch: Vec<Event>) {
        let mut queue = self.inner.lock();
        for event in batch.into_iter().rev() {
            queue.push_front(event);
        }
    }

    /// Remove and return every queued event
    pub fn drain_all(&self) -> Vec<Event> {
        self.inner.lock().drain(..).collect()
    }

    /// Copy of the current contents, in order
    pub fn snapshot(&self) -> Vec<Event> {
        self.inner.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
