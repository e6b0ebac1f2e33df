//! In-memory store backends
//!
//! State is lost when the process exits. Ordering follows insertion order,
//! which gives FIFO member delivery.

use crate::state::{FragmentStatus, MemberStatus};
use crate::storage::traits::{FragmentStore, MemberStore, MemberVersionStore, StorageResult};
use crate::storage::{FragmentRecord, MemberRecord, MemberVersionRecord};
use oxrdf::Graph;
use std::collections::{HashMap, VecDeque};

#[derive(Debug)]
struct StoredFragment {
    seq: u64,
    record: FragmentRecord,
}

/// Fragment store backed by a hash map
#[derive(Debug, Default)]
pub struct InMemoryFragmentStore {
    records: HashMap<String, StoredFragment>,
    next_seq: u64,
}

impl InMemoryFragmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FragmentStore for InMemoryFragmentStore {
    fn exists_by_url(&self, url: &str) -> StorageResult<bool> {
        Ok(self.records.contains_key(url))
    }

    fn save(&mut self, record: &FragmentRecord) -> StorageResult<()> {
        if let Some(stored) = self.records.get_mut(&record.url) {
            stored.record = record.clone();
            return Ok(());
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.insert(
            record.url.clone(),
            StoredFragment {
                seq,
                record: record.clone(),
            },
        );
        Ok(())
    }

    fn next_with_status(&self, status: FragmentStatus) -> StorageResult<Option<FragmentRecord>> {
        let candidates = self.records.values().filter(|s| s.record.status == status);

        let next = if status == FragmentStatus::MutableAndActive {
            candidates.min_by_key(|s| (s.record.earliest_next_visit, s.seq))
        } else {
            candidates.min_by_key(|s| s.seq)
        };

        Ok(next.map(|s| s.record.clone()))
    }

    fn reset_all(&mut self) -> StorageResult<()> {
        self.records.clear();
        self.next_seq = 0;
        Ok(())
    }
}

/// Member store with a FIFO queue of unprocessed ids
#[derive(Debug, Default)]
pub struct InMemoryMemberStore {
    records: HashMap<String, MemberRecord>,
    unprocessed: VecDeque<String>,
}

impl InMemoryMemberStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemberStore for InMemoryMemberStore {
    fn next_unprocessed(&self) -> StorageResult<Option<MemberRecord>> {
        Ok(self
            .unprocessed
            .front()
            .and_then(|id| self.records.get(id))
            .cloned())
    }

    fn is_processed(&self, id: &str) -> StorageResult<bool> {
        Ok(self
            .records
            .get(id)
            .is_some_and(|r| r.status == MemberStatus::Processed))
    }

    fn save(&mut self, record: &MemberRecord) -> StorageResult<()> {
        let previous = self.records.get(&record.id).map(|r| r.status);

        match record.status {
            MemberStatus::Unprocessed => {
                if previous != Some(MemberStatus::Unprocessed) {
                    self.unprocessed.push_back(record.id.clone());
                }
                self.records.insert(record.id.clone(), record.clone());
            }
            MemberStatus::Processed => {
                if previous == Some(MemberStatus::Unprocessed) {
                    self.unprocessed.retain(|id| id != &record.id);
                }
                self.records.insert(
                    record.id.clone(),
                    MemberRecord {
                        model: Graph::new(),
                        ..record.clone()
                    },
                );
            }
        }
        Ok(())
    }

    fn reset_all(&mut self) -> StorageResult<()> {
        self.records.clear();
        self.unprocessed.clear();
        Ok(())
    }
}

/// Version store keeping the latest timestamp per entity
#[derive(Debug, Default)]
pub struct InMemoryMemberVersionStore {
    versions: HashMap<String, MemberVersionRecord>,
}

impl InMemoryMemberVersionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemberVersionStore for InMemoryMemberVersionStore {
    fn add_member_version(&mut self, version: &MemberVersionRecord) -> StorageResult<()> {
        self.versions
            .insert(version.version_of.clone(), version.clone());
        Ok(())
    }

    fn is_version_after_timestamp(&self, version: &MemberVersionRecord) -> StorageResult<bool> {
        Ok(self
            .versions
            .get(&version.version_of)
            .map_or(true, |stored| stored.timestamp < version.timestamp))
    }

    fn reset_all(&mut self) -> StorageResult<()> {
        self.versions.clear();
        Ok(())
    }
}
