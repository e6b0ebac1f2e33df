//! Fragment scheduling
//!
//! Fragments never visited go first, in discovery order. After that the
//! mutable fragment whose next visit is due soonest is picked, and the
//! worker sleeps until it is due. Immutable fragments are never picked.

use crate::crawler::coordinator::StopHandle;
use crate::state::FragmentStatus;
use crate::storage::{FragmentRecord, FragmentStore, StorageResult};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Selects the next fragment and throttles revisits
pub struct Scheduler {
    stop: StopHandle,
}

impl Scheduler {
    pub fn new(stop: StopHandle) -> Self {
        Self { stop }
    }

    /// Returns the next fragment to visit, or None when nothing is left
    pub fn next_fragment(&self, store: &dyn FragmentStore) -> StorageResult<Option<FragmentRecord>> {
        if let Some(record) = store.next_with_status(FragmentStatus::NotVisited)? {
            return Ok(Some(record));
        }
        store.next_with_status(FragmentStatus::MutableAndActive)
    }

    /// Sleeps until the fragment may be fetched
    ///
    /// Returns false if a stop was requested before the fragment became due.
    pub async fn wait_until_ready(&self, record: &FragmentRecord) -> bool {
        let notified = self.stop.notified();
        if !self.stop.is_running() {
            return false;
        }

        let Some(delay) = time_until_ready(record, Utc::now()) else {
            return true;
        };

        tracing::debug!("Waiting {:?} before revisiting {}", delay, record.url);
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = notified => false,
        }
    }
}

/// Time left before a fragment is due, or None if it is due now
pub fn time_until_ready(record: &FragmentRecord, now: DateTime<Utc>) -> Option<Duration> {
    if record.status != FragmentStatus::MutableAndActive || record.is_ready(now) {
        return None;
    }
    (record.earliest_next_visit - now).to_std().ok()
}
