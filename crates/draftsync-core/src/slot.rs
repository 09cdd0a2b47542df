//! Local durable slot: write-through persistence of the draft snapshot.
//!
//! The slot is what makes the draft survive reloads independent of network
//! sync outcome. Saves are synchronous from the caller's perspective; a save
//! failure (quota exceeded, storage disabled) is returned to the engine,
//! which reports it via the status stream instead of raising through
//! `update_draft`.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::LocalRecord;

/// Device-local key-value store scoped to the browser origin.
///
/// `set` may fail (quota); `get`/`remove` are infallible in practice but a
/// missing key is simply `None`.
pub trait LocalPersistence: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<()>;
    fn remove(&self, key: &str);
}

impl<P: LocalPersistence + ?Sized> LocalPersistence for std::sync::Arc<P> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key);
    }
}

/// In-memory persistence, optionally capacity-limited to exercise the
/// quota-exceeded path.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    entries: Mutex<HashMap<String, String>>,
    capacity_bytes: Option<usize>,
}

impl MemoryPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persistence that rejects any value larger than `capacity_bytes`.
    #[must_use]
    pub fn with_capacity_limit(capacity_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity_bytes: Some(capacity_bytes),
        }
    }
}

impl LocalPersistence for MemoryPersistence {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        if let Some(limit) = self.capacity_bytes {
            if value.len() > limit {
                return Err(Error::Storage(format!(
                    "quota exceeded: {} bytes > {limit} byte limit",
                    value.len()
                )));
            }
        }
        self.entries
            .lock()
            .map_err(|_| Error::Storage("persistence lock poisoned".to_string()))?
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// The draft's slot in local persistence: one serialized `LocalRecord`
/// under a per-owner key.
pub struct DurableSlot<P: LocalPersistence> {
    persistence: P,
    key: String,
}

impl<P: LocalPersistence> DurableSlot<P> {
    pub fn new(persistence: P, key: impl Into<String>) -> Self {
        Self {
            persistence,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Persist `record`, replacing whatever the slot held.
    pub fn save(&self, record: &LocalRecord) -> Result<()> {
        let payload = serde_json::to_string(record)?;
        self.persistence.set(&self.key, payload)
    }

    /// Load the slot's record, if any. A corrupt payload reads as empty
    /// rather than failing hydration.
    #[must_use]
    pub fn load(&self) -> Option<LocalRecord> {
        let payload = self.persistence.get(&self.key)?;
        match serde_json::from_str(&payload) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!("Discarding corrupt local draft record: {error}");
                None
            }
        }
    }

    pub fn clear(&self) {
        self.persistence.remove(&self.key);
    }

    /// Record that a sync was confirmed remotely by bumping `saved_at`,
    /// but only while the stored draft is still the synced version. A newer
    /// local record must not be clobbered by a stale confirmation.
    pub fn confirm(&self, version: u64, saved_at: i64) -> Result<()> {
        let Some(mut record) = self.load() else {
            return Ok(());
        };
        if record.draft.version != version {
            return Ok(());
        }
        record.saved_at = saved_at;
        self.save(&record)
    }
}
