// events/bus.rs
//
// Process-wide publish/subscribe channel for retranscription events. Every
// subscription is scoped to one meeting id and released when its handle drops.

use super::types::{EventError, RetranscriptionEvent};
use dashmap::DashMap;
use log::{debug, warn};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

type Listener = Arc<dyn Fn(&RetranscriptionEvent) + Send + Sync>;

struct Registration {
    meeting_id: String,
    listener: Listener,
}

struct BusInner {
    next_id: AtomicU64,
    listeners: DashMap<u64, Registration>,
}

/// Cloneable handle to the shared event channel.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                next_id: AtomicU64::new(1),
                listeners: DashMap::new(),
            }),
        }
    }

    /// Register `listener` for events whose meeting id equals `meeting_id`.
    pub fn subscribe<F>(&self, meeting_id: impl Into<String>, listener: F) -> Subscription
    where
        F: Fn(&RetranscriptionEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let meeting_id = meeting_id.into();
        debug!("Subscribing listener {} to meeting {}", id, meeting_id);

        self.inner.listeners.insert(
            id,
            Registration {
                meeting_id: meeting_id.clone(),
                listener: Arc::new(listener),
            },
        );

        Subscription {
            id,
            meeting_id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Channel flavour of [`EventBus::subscribe`] for async consumers.
    pub fn subscribe_channel(
        &self,
        meeting_id: impl Into<String>,
    ) -> (Subscription, mpsc::UnboundedReceiver<RetranscriptionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(meeting_id, move |event| {
            // Receiver gone means the consumer stopped listening.
            let _ = tx.send(event.clone());
        });
        (subscription, rx)
    }

    /// Deliver `event` to every listener of its meeting id. Returns the number
    /// of listeners reached.
    pub fn publish(&self, event: &RetranscriptionEvent) -> usize {
        // Snapshot matching listeners so none run while the map is locked.
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .iter()
            .filter(|entry| entry.meeting_id == event.meeting_id())
            .map(|entry| entry.listener.clone())
            .collect();

        if listeners.is_empty() {
            debug!(
                "No listeners for {} on meeting {}",
                event.name(),
                event.meeting_id()
            );
        }

        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }

    /// Decode and deliver an event received by transport name.
    pub fn publish_named(&self, name: &str, payload: Value) -> Result<usize, EventError> {
        match RetranscriptionEvent::from_named(name, payload) {
            Ok(event) => Ok(self.publish(&event)),
            Err(e) => {
                warn!("Dropping undecodable event: {}", e);
                Err(e)
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }
}

/// Live registration on an [`EventBus`]; unsubscribes on drop.
pub struct Subscription {
    id: u64,
    meeting_id: String,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn meeting_id(&self) -> &str {
        &self.meeting_id
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.listeners.remove(&self.id);
            debug!(
                "Released listener {} for meeting {}",
                self.id, self.meeting_id
            );
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("meeting_id", &self.meeting_id)
            .finish()
    }
}
