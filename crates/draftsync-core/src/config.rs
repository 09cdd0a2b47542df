//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::OwnerId;

const DEFAULT_DEBOUNCE_WINDOW_MS: u64 = 500;
const DEFAULT_SYNC_TIMEOUT_MS: u64 = 4_000;
const DEFAULT_STALENESS_BOUND_MS: i64 = 7 * 24 * 60 * 60 * 1_000;
const DEFAULT_SLOT_PREFIX: &str = "draft";

/// Tunables for one draft engine instance.
///
/// Defaults match the reference behavior: 500 ms debounce quiet period,
/// 4 s network timeout, and a one-week staleness bound on local hydration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Quiet period before an accumulated mutation burst is synced
    pub debounce_window_ms: u64,
    /// Upper bound on one network write attempt
    pub sync_timeout_ms: u64,
    /// Local records older than this are ignored at hydration
    pub staleness_bound_ms: i64,
    /// Prefix of the local slot key (`<prefix>:<owner>`)
    pub slot_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_window_ms: DEFAULT_DEBOUNCE_WINDOW_MS,
            sync_timeout_ms: DEFAULT_SYNC_TIMEOUT_MS,
            staleness_bound_ms: DEFAULT_STALENESS_BOUND_MS,
            slot_prefix: DEFAULT_SLOT_PREFIX.to_string(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub const fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    #[must_use]
    pub const fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    /// Slot key for `owner_id`, shared by every tab editing that draft.
    #[must_use]
    pub fn slot_key(&self, owner_id: &OwnerId) -> String {
        format!("{}:{}", self.slot_prefix, owner_id)
    }
}
