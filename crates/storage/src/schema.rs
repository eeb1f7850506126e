use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA busy_timeout = 5000;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS buyers (
    id BLOB PRIMARY KEY CHECK (length(id) = 16),
    owner_id BLOB NOT NULL CHECK (length(owner_id) = 16),
    updated_at INTEGER NOT NULL,
    full_name TEXT NOT NULL,
    email TEXT,
    phone TEXT NOT NULL,
    city TEXT NOT NULL,
    property_type TEXT NOT NULL,
    bhk TEXT,
    purpose TEXT NOT NULL,
    budget_min INTEGER,
    budget_max INTEGER,
    timeline TEXT NOT NULL,
    source TEXT NOT NULL,
    notes TEXT,
    tags BLOB NOT NULL,
    status TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_buyers_updated ON buyers (updated_at, id);
CREATE INDEX IF NOT EXISTS idx_buyers_city ON buyers (city, updated_at);
CREATE INDEX IF NOT EXISTS idx_buyers_status ON buyers (status, updated_at);

CREATE TABLE IF NOT EXISTS buyer_history (
    id BLOB PRIMARY KEY CHECK (length(id) = 16),
    buyer_id BLOB NOT NULL REFERENCES buyers (id),
    changed_by BLOB NOT NULL CHECK (length(changed_by) = 16),
    changed_at INTEGER NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('created', 'updated')),
    diff BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_history_buyer ON buyer_history (buyer_id, changed_at);

CREATE TRIGGER IF NOT EXISTS buyer_history_no_update
BEFORE UPDATE ON buyer_history
BEGIN
    SELECT RAISE(ABORT, 'buyer_history is append-only');
END;

CREATE TRIGGER IF NOT EXISTS buyer_history_no_delete
BEFORE DELETE ON buyer_history
BEGIN
    SELECT RAISE(ABORT, 'buyer_history is append-only');
END;
";
