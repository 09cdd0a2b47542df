//! Sync status surfaced to the wizard UI.

use serde::{Deserialize, Serialize};

/// Finite sync state attached to the draft; never persisted remotely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Mutations may be pending; the debounce timer may be armed
    #[default]
    Idle,
    /// A network write is in flight
    Syncing,
    /// The remote store acknowledged the latest draft
    Synced,
    /// The last attempt failed; retried on the next mutation or reconnect
    Error,
}

/// One observation of the engine's sync state, carried on the status stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: SyncStatus,
    /// When the remote store last acknowledged a write (unix ms)
    pub last_synced_at: Option<i64>,
    /// False when the latest local save failed (quota exceeded etc.);
    /// the in-memory draft stays authoritative for the tab's lifetime
    pub durable: bool,
}

impl StatusSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: SyncStatus::Idle,
            last_synced_at: None,
            durable: true,
        }
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
