//! Database schema definitions
//!
//! All three stores share one database file. Timestamps are stored as
//! milliseconds since the Unix epoch; `seq` preserves insertion order.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Crawl state of every discovered fragment
CREATE TABLE IF NOT EXISTS tree_nodes (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL,
    earliest_next_visit INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tree_nodes_status ON tree_nodes(status, earliest_next_visit);

-- Discovered members; the model is dropped once supplied
CREATE TABLE IF NOT EXISTS members (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    model TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_members_status ON members(status, seq);

-- Latest supplied version per versioned entity
CREATE TABLE IF NOT EXISTS member_versions (
    version_of TEXT PRIMARY KEY,
    timestamp INTEGER NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
