//! Single-slot snapshot store.
//!
//! The store starts empty and holds at most one [`Snapshot`]. A write swaps in a freshly built
//! `Arc<Snapshot>` in one atomic step, so readers observe either the previous snapshot or the
//! new one in full. Last write wins.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};

use crate::snapshot::{CandidateSnapshot, Snapshot};

/// Cloneable handle to the shared slot. Clones observe the same state.
#[derive(Clone, Debug, Default)]
pub struct SnapshotStore {
    slot: Arc<ArcSwapOption<Snapshot>>,
}

impl SnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored snapshot, stamping `lastUpdated` with the current time.
    pub fn write(&self, candidate: CandidateSnapshot) -> Arc<Snapshot> {
        self.write_at(candidate, Utc::now())
    }

    /// Replace the stored snapshot with an explicit `lastUpdated` stamp.
    pub fn write_at(&self, candidate: CandidateSnapshot, at: DateTime<Utc>) -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot::from_candidate(candidate, at));
        self.slot.store(Some(Arc::clone(&snapshot)));
        snapshot
    }

    /// Current snapshot, or `None` before the first write.
    pub fn read(&self) -> Option<Arc<Snapshot>> {
        self.slot.load_full()
    }

    pub fn is_populated(&self) -> bool {
        self.slot.load().is_some()
    }
}
