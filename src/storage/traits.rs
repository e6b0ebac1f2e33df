//! Storage traits and error types
//!
//! This module defines the contracts every crawl state backend satisfies,
//! and the errors they report.

use crate::state::FragmentStatus;
use crate::storage::{FragmentRecord, MemberRecord, MemberVersionRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persists the crawl state of fragments, keyed by URL
///
/// At most one record exists per URL: `save` replaces an existing record with
/// the same URL and keeps its original insertion position.
pub trait FragmentStore: Send {
    /// Returns true if a record with this URL exists
    fn exists_by_url(&self, url: &str) -> StorageResult<bool>;

    /// Inserts or replaces the record for its URL
    fn save(&mut self, record: &FragmentRecord) -> StorageResult<()>;

    /// Returns one record in the given status
    ///
    /// Ties are broken by insertion order. For `MutableAndActive` the record
    /// with the earliest next visit comes first.
    fn next_with_status(&self, status: FragmentStatus) -> StorageResult<Option<FragmentRecord>>;

    /// Removes every record
    fn reset_all(&mut self) -> StorageResult<()>;
}

/// Persists members and whether they have been supplied, keyed by member id
pub trait MemberStore: Send {
    /// Returns the oldest unprocessed member
    fn next_unprocessed(&self) -> StorageResult<Option<MemberRecord>>;

    /// Returns true if a member with this id has already been supplied
    fn is_processed(&self, id: &str) -> StorageResult<bool>;

    /// Inserts or replaces the record for its id
    ///
    /// Processed records may drop their graph payload.
    fn save(&mut self, record: &MemberRecord) -> StorageResult<()>;

    /// Saves several records at once
    fn save_all(&mut self, records: &[MemberRecord]) -> StorageResult<()> {
        for record in records {
            self.save(record)?;
        }
        Ok(())
    }

    /// Removes every record
    fn reset_all(&mut self) -> StorageResult<()>;
}

/// Remembers the latest supplied version timestamp per versioned entity
pub trait MemberVersionStore: Send {
    /// Records a supplied version, replacing the previous one for the same entity
    fn add_member_version(&mut self, version: &MemberVersionRecord) -> StorageResult<()>;

    /// Returns true if no version of the same entity with an equal or later
    /// timestamp was recorded before
    fn is_version_after_timestamp(&self, version: &MemberVersionRecord) -> StorageResult<bool>;

    /// Removes every record
    fn reset_all(&mut self) -> StorageResult<()>;
}
