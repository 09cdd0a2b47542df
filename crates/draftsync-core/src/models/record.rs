//! Local durable record and the last-write-wins freshness comparator.

use serde::{Deserialize, Serialize};

use super::draft::Draft;

/// What is actually written to the local durable slot: the draft snapshot
/// plus the time it was saved (bumped again when a sync is confirmed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalRecord {
    pub draft: Draft,
    /// Save timestamp (unix ms); also the staleness reference at hydration
    pub saved_at: i64,
}

impl LocalRecord {
    #[must_use]
    pub fn new(draft: Draft, saved_at: i64) -> Self {
        Self { draft, saved_at }
    }

    /// Last-write-wins comparator: `version` first, `updated_at` tiebreak.
    ///
    /// Used both for cross-tab adoption (an older record arriving later must
    /// never win) and for deciding whether an in-flight result still applies.
    #[must_use]
    pub fn is_fresher_than(&self, other: &Self) -> bool {
        self.draft.is_fresher_than(&other.draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::draft::OwnerId;

    fn record(version: u64, updated_at: i64) -> LocalRecord {
        let mut draft = Draft::new(OwnerId::new("op-1"), updated_at);
        draft.version = version;
        draft.updated_at = updated_at;
        LocalRecord::new(draft, updated_at)
    }

    #[test]
    fn higher_version_is_fresher_regardless_of_timestamp() {
        assert!(record(3, 50).is_fresher_than(&record(2, 100)));
        assert!(!record(2, 100).is_fresher_than(&record(3, 50)));
    }

    #[test]
    fn timestamp_breaks_version_ties() {
        assert!(record(2, 100).is_fresher_than(&record(2, 50)));
        assert!(!record(2, 50).is_fresher_than(&record(2, 100)));
    }

    #[test]
    fn identical_records_are_not_fresher_than_each_other() {
        assert!(!record(2, 100).is_fresher_than(&record(2, 100)));
    }
}
