//! SQLite store backends
//!
//! Each store owns its own connection to the shared database file, so the
//! three stores can be locked independently.

use crate::state::{FragmentStatus, MemberStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    FragmentStore, MemberStore, MemberVersionStore, StorageError, StorageResult,
};
use crate::storage::{FragmentRecord, MemberRecord, MemberVersionRecord};
use chrono::{DateTime, TimeZone, Utc};
use oxrdf::{Graph, Triple};
use oxrdfio::{RdfFormat, RdfParser};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

/// Opens (or creates) the state database at the given path
pub fn open_database(path: &Path) -> StorageResult<Connection> {
    let conn = Connection::open(path)?;

    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;
    ",
    )?;

    initialize_schema(&conn)?;

    Ok(conn)
}

#[cfg(test)]
fn open_in_memory() -> StorageResult<Connection> {
    let conn = Connection::open_in_memory()?;
    initialize_schema(&conn)?;
    Ok(conn)
}

fn to_millis(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis()
}

fn from_millis(millis: i64) -> StorageResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| StorageError::Serialization(format!("Invalid timestamp: {}", millis)))
}

/// Serializes a member graph as N-Triples
fn serialize_graph(graph: &Graph) -> String {
    graph.to_string()
}

/// Parses a member graph previously written by `serialize_graph`
fn deserialize_graph(text: &str) -> StorageResult<Graph> {
    let mut graph = Graph::new();
    for quad in RdfParser::from_format(RdfFormat::NTriples).for_reader(text.as_bytes()) {
        let quad = quad.map_err(|e| StorageError::Serialization(e.to_string()))?;
        graph.insert(&Triple::new(quad.subject, quad.predicate, quad.object));
    }
    Ok(graph)
}

/// SQLite-backed fragment store
pub struct SqliteFragmentStore {
    conn: Connection,
}

impl SqliteFragmentStore {
    pub fn open(path: &Path) -> StorageResult<Self> {
        Ok(Self {
            conn: open_database(path)?,
        })
    }

    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        Ok(Self {
            conn: open_in_memory()?,
        })
    }
}

impl FragmentStore for SqliteFragmentStore {
    fn exists_by_url(&self, url: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT seq FROM tree_nodes WHERE url = ?1", params![url], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn save(&mut self, record: &FragmentRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO tree_nodes (url, status, earliest_next_visit) VALUES (?1, ?2, ?3)
             ON CONFLICT(url) DO UPDATE SET status = excluded.status,
             earliest_next_visit = excluded.earliest_next_visit",
            params![
                record.url,
                record.status.to_db_string(),
                to_millis(record.earliest_next_visit)
            ],
        )?;
        Ok(())
    }

    fn next_with_status(&self, status: FragmentStatus) -> StorageResult<Option<FragmentRecord>> {
        let query = if status == FragmentStatus::MutableAndActive {
            "SELECT url, earliest_next_visit FROM tree_nodes WHERE status = ?1
             ORDER BY earliest_next_visit ASC, seq ASC LIMIT 1"
        } else {
            "SELECT url, earliest_next_visit FROM tree_nodes WHERE status = ?1
             ORDER BY seq ASC LIMIT 1"
        };

        let row: Option<(String, i64)> = self
            .conn
            .query_row(query, params![status.to_db_string()], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;

        row.map(|(url, next_visit)| {
            Ok(FragmentRecord {
                url,
                status,
                earliest_next_visit: from_millis(next_visit)?,
            })
        })
        .transpose()
    }

    fn reset_all(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM tree_nodes", [])?;
        Ok(())
    }
}

/// SQLite-backed member store
pub struct SqliteMemberStore {
    conn: Connection,
}

impl SqliteMemberStore {
    pub fn open(path: &Path) -> StorageResult<Self> {
        Ok(Self {
            conn: open_database(path)?,
        })
    }

    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        Ok(Self {
            conn: open_in_memory()?,
        })
    }

    fn upsert(conn: &Connection, record: &MemberRecord) -> StorageResult<()> {
        let model = match record.status {
            MemberStatus::Unprocessed => serialize_graph(&record.model),
            MemberStatus::Processed => String::new(),
        };

        conn.execute(
            "INSERT INTO members (id, status, created_at, model) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET status = excluded.status,
             created_at = excluded.created_at, model = excluded.model",
            params![
                record.id,
                record.status.to_db_string(),
                to_millis(record.created_at),
                model
            ],
        )?;
        Ok(())
    }
}

impl MemberStore for SqliteMemberStore {
    fn next_unprocessed(&self) -> StorageResult<Option<MemberRecord>> {
        let row: Option<(String, i64, String)> = self
            .conn
            .query_row(
                "SELECT id, created_at, model FROM members WHERE status = ?1
                 ORDER BY seq ASC LIMIT 1",
                params![MemberStatus::Unprocessed.to_db_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(|(id, created_at, model)| {
            Ok(MemberRecord {
                id,
                status: MemberStatus::Unprocessed,
                model: deserialize_graph(&model)?,
                created_at: from_millis(created_at)?,
            })
        })
        .transpose()
    }

    fn is_processed(&self, id: &str) -> StorageResult<bool> {
        let status: Option<String> = self
            .conn
            .query_row("SELECT status FROM members WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(status.as_deref().and_then(MemberStatus::from_db_string) == Some(MemberStatus::Processed))
    }

    fn save(&mut self, record: &MemberRecord) -> StorageResult<()> {
        Self::upsert(&self.conn, record)
    }

    fn save_all(&mut self, records: &[MemberRecord]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        for record in records {
            Self::upsert(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn reset_all(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM members", [])?;
        Ok(())
    }
}

/// SQLite-backed member version store
pub struct SqliteMemberVersionStore {
    conn: Connection,
}

impl SqliteMemberVersionStore {
    pub fn open(path: &Path) -> StorageResult<Self> {
        Ok(Self {
            conn: open_database(path)?,
        })
    }

    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        Ok(Self {
            conn: open_in_memory()?,
        })
    }
}

impl MemberVersionStore for SqliteMemberVersionStore {
    fn add_member_version(&mut self, version: &MemberVersionRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO member_versions (version_of, timestamp) VALUES (?1, ?2)",
            params![version.version_of, to_millis(version.timestamp)],
        )?;
        Ok(())
    }

    fn is_version_after_timestamp(&self, version: &MemberVersionRecord) -> StorageResult<bool> {
        let newer_or_equal: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM member_versions WHERE version_of = ?1 AND timestamp >= ?2",
            params![version.version_of, to_millis(version.timestamp)],
            |row| row.get(0),
        )?;
        Ok(newer_or_equal == 0)
    }

    fn reset_all(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM member_versions", [])?;
        Ok(())
    }
}
