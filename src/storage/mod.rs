//! Storage module for persisting crawl state
//!
//! This module holds the fragment and member records, the store contracts,
//! and two backends:
//! - an in-memory backend for ephemeral runs and tests
//! - a SQLite backend for runs that resume across restarts

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::{InMemoryFragmentStore, InMemoryMemberStore, InMemoryMemberVersionStore};
pub use sqlite::{open_database, SqliteFragmentStore, SqliteMemberStore, SqliteMemberVersionStore};
pub use traits::{FragmentStore, MemberStore, MemberVersionStore, StorageError, StorageResult};

use crate::config::{PersistenceConfig, StatePersistenceStrategy};
use crate::crawler::{MutabilityStatus, SuppliedMember};
use crate::state::{FragmentStatus, MemberStatus};
use chrono::{DateTime, Utc};
use oxrdf::Graph;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Crawl state of one fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentRecord {
    pub url: String,
    pub status: FragmentStatus,
    /// Only meaningful while `MutableAndActive`
    pub earliest_next_visit: DateTime<Utc>,
}

impl FragmentRecord {
    /// Creates a record for a freshly discovered fragment
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: FragmentStatus::NotVisited,
            earliest_next_visit: Utc::now(),
        }
    }

    /// Applies the mutability verdict of a fetch
    pub fn update_status(&mut self, mutability: &MutabilityStatus) {
        if mutability.is_immutable() {
            self.status = FragmentStatus::Immutable;
        } else {
            self.status = FragmentStatus::MutableAndActive;
        }
        self.earliest_next_visit = mutability.earliest_next_visit();
    }

    /// Returns true if the fragment may be fetched at `now`
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            FragmentStatus::NotVisited => true,
            FragmentStatus::Immutable => false,
            FragmentStatus::MutableAndActive => self.earliest_next_visit <= now,
        }
    }
}

/// A member discovered in a fragment
#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub id: String,
    pub status: MemberStatus,
    pub model: Graph,
    pub created_at: DateTime<Utc>,
}

impl MemberRecord {
    /// Creates an unprocessed member record
    pub fn new(id: impl Into<String>, model: Graph, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            status: MemberStatus::Unprocessed,
            model,
            created_at,
        }
    }

    /// Marks the member processed and hands its payload to the caller
    pub fn supply(&mut self) -> SuppliedMember {
        self.status = MemberStatus::Processed;
        SuppliedMember {
            id: self.id.clone(),
            model: std::mem::take(&mut self.model),
            created_at: self.created_at,
        }
    }
}

/// The latest supplied version of a versioned entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberVersionRecord {
    pub version_of: String,
    pub timestamp: DateTime<Utc>,
}

impl MemberVersionRecord {
    pub fn new(version_of: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            version_of: version_of.into(),
            timestamp,
        }
    }
}

/// The stores backing one client instance
///
/// Each store sits behind its own mutex so teardown can run from another
/// task while the crawl engine is waiting on the network.
pub struct StatePersistence {
    fragments: Mutex<Box<dyn FragmentStore>>,
    members: Mutex<Box<dyn MemberStore>>,
    versions: Mutex<Box<dyn MemberVersionStore>>,
    destroyed: AtomicBool,
}

impl StatePersistence {
    pub fn new(
        fragments: Box<dyn FragmentStore>,
        members: Box<dyn MemberStore>,
        versions: Box<dyn MemberVersionStore>,
    ) -> Self {
        Self {
            fragments: Mutex::new(fragments),
            members: Mutex::new(members),
            versions: Mutex::new(versions),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Creates state that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::new(
            Box::new(InMemoryFragmentStore::new()),
            Box::new(InMemoryMemberStore::new()),
            Box::new(InMemoryMemberVersionStore::new()),
        )
    }

    /// Opens (or creates) SQLite-backed state at `path`
    pub fn sqlite(path: &Path) -> StorageResult<Self> {
        Ok(Self::new(
            Box::new(SqliteFragmentStore::open(path)?),
            Box::new(SqliteMemberStore::open(path)?),
            Box::new(SqliteMemberVersionStore::open(path)?),
        ))
    }

    /// Builds the stores selected by the persistence configuration
    pub fn from_config(config: &PersistenceConfig) -> StorageResult<Self> {
        match config.strategy {
            StatePersistenceStrategy::Memory => {
                tracing::debug!("Using in-memory crawl state");
                Ok(Self::in_memory())
            }
            StatePersistenceStrategy::Sqlite => {
                tracing::debug!("Using SQLite crawl state at {}", config.database_path);
                Self::sqlite(Path::new(&config.database_path))
            }
        }
    }

    pub fn fragments(&self) -> StorageResult<MutexGuard<'_, Box<dyn FragmentStore>>> {
        self.fragments
            .lock()
            .map_err(|_| StorageError::LockPoisoned("fragment store"))
    }

    pub fn members(&self) -> StorageResult<MutexGuard<'_, Box<dyn MemberStore>>> {
        self.members
            .lock()
            .map_err(|_| StorageError::LockPoisoned("member store"))
    }

    pub fn versions(&self) -> StorageResult<MutexGuard<'_, Box<dyn MemberVersionStore>>> {
        self.versions
            .lock()
            .map_err(|_| StorageError::LockPoisoned("member version store"))
    }

    /// Resets every store, at most once per instance
    ///
    /// Returns false if the state was already destroyed.
    pub fn destroy_state(&self) -> StorageResult<bool> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        self.members()?.reset_all()?;
        self.fragments()?.reset_all()?;
        self.versions()?.reset_all()?;
        tracing::info!("Crawl state destroyed");
        Ok(true)
    }
}
