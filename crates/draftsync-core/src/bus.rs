//! Cross-tab notification channel.
//!
//! When one tab saves the draft, every other tab holding the same slot key
//! must observe the new record without polling. The channel is modeled as an
//! explicit publish/subscribe abstraction; `InProcessBus` is the
//! single-process backing used by the test harness and server-rendered
//! sessions, and stands in for a browser broadcast channel.
//!
//! Adoption filtering (last-write-wins) is the subscriber's job, not the
//! bus's: the bus delivers every published record, including the
//! publisher's own.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::models::LocalRecord;

/// Callback invoked with every record published under a subscribed key.
pub type Handler = Box<dyn Fn(&LocalRecord) + Send + Sync>;

/// Publish/subscribe channel keyed by logical draft slot.
pub trait DraftChannel: Send + Sync {
    /// Deliver `record` to every handler subscribed to `key`.
    fn publish(&self, key: &str, record: &LocalRecord);

    /// Register `handler` for records published under `key`. Dropping the
    /// returned subscription unregisters it.
    fn subscribe(&self, key: &str, handler: Handler) -> Subscription;
}

#[derive(Default)]
struct Registry {
    handlers: Mutex<HashMap<String, Vec<(u64, Handler)>>>,
    next_id: AtomicU64,
}

/// In-process bus: all tabs of a session share one instance.
#[derive(Clone, Default)]
pub struct InProcessBus {
    registry: Arc<Registry>,
}

impl InProcessBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftChannel for InProcessBus {
    fn publish(&self, key: &str, record: &LocalRecord) {
        // Delivery holds the registry lock: handlers must not call back
        // into the bus.
        let handlers = self.registry.handlers.lock();
        let Ok(handlers) = handlers else { return };
        if let Some(subscribers) = handlers.get(key) {
            for (_, handler) in subscribers {
                handler(record);
            }
        }
    }

    fn subscribe(&self, key: &str, handler: Handler) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut handlers) = self.registry.handlers.lock() {
            handlers.entry(key.to_string()).or_default().push((id, handler));
        }
        Subscription {
            registry: Arc::downgrade(&self.registry),
            key: key.to_string(),
            id,
        }
    }
}

/// Guard for one bus subscription; unsubscribes on drop.
pub struct Subscription {
    registry: Weak<Registry>,
    key: String,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let Ok(mut handlers) = registry.handlers.lock() else {
            return;
        };
        if let Some(subscribers) = handlers.get_mut(&self.key) {
            subscribers.retain(|(id, _)| *id != self.id);
            if subscribers.is_empty() {
                handlers.remove(&self.key);
            }
        }
    }
}
