//! Background refresh bookkeeping
//!
//! Background refreshes run as detached tokio tasks. This module tracks which
//! cities have a refresh in flight so overlapping triggers are skipped, and
//! broadcasts [`RefreshMessage`] events to anyone who subscribed.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Capacity of the event channel; slow subscribers lose the oldest events
const EVENT_CAPACITY: usize = 32;

/// Events emitted by background refresh tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshMessage {
    /// A refresh task started for a city
    Started { city: String },
    /// The cache now holds a fresh forecast for the city
    Completed { city: String },
    /// The refresh failed; the cached forecast is unchanged
    Failed { city: String, error: String },
    /// No refresh was started
    Skipped { city: String, reason: String },
}

impl RefreshMessage {
    pub fn city(&self) -> &str {
        match self {
            RefreshMessage::Started { city }
            | RefreshMessage::Completed { city }
            | RefreshMessage::Failed { city, .. }
            | RefreshMessage::Skipped { city, .. } => city,
        }
    }
}

/// In-flight set plus event channel shared by all refresh tasks
#[derive(Debug)]
pub struct RefreshCoordinator {
    in_flight: Mutex<HashSet<String>>,
    events: broadcast::Sender<RefreshMessage>,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            in_flight: Mutex::new(HashSet::new()),
            events,
        }
    }
}

impl RefreshCoordinator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Receives every event sent after this call
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshMessage> {
        self.events.subscribe()
    }

    /// Marks `key` as in flight
    ///
    /// # Returns
    /// * `Some(InFlightGuard)` - The caller owns the refresh until the guard drops
    /// * `None` - A refresh for `key` is already running
    pub fn try_begin(self: &Arc<Self>, key: &str) -> Option<InFlightGuard> {
        if !self.in_flight.lock().insert(key.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            coordinator: Arc::clone(self),
            key: key.to_string(),
        })
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.lock().contains(key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Sends an event; having no subscribers is not an error
    pub fn notify(&self, message: RefreshMessage) {
        let _ = self.events.send(message);
    }
}

/// Clears the in-flight mark when dropped, including when the task panics
#[derive(Debug)]
pub struct InFlightGuard {
    coordinator: Arc<RefreshCoordinator>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.coordinator.in_flight.lock().remove(&self.key);
    }
}
