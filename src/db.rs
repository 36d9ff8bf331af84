use std::time::Duration;

use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Result};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Every backend table mirrored into the cache. Rows are stored as the
/// JSON payload the backend serves, keyed by record id.
pub const ENTITY_TABLES: [&str; 10] = [
    "projects",
    "varieties",
    "locations",
    "plots",
    "trial_records",
    "field_logs",
    "tasks",
    "seed_batches",
    "seed_movements",
    "users",
];

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 1] = [Migration {
    version: 1,
    name: "baseline_cache_schema_v1",
    sql: r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS varieties (
    id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS locations (
    id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS plots (
    id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS trial_records (
    id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS field_logs (
    id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS seed_batches (
    id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS seed_movements (
    id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_plots_updated_at ON plots(updated_at);
CREATE INDEX IF NOT EXISTS idx_tasks_updated_at ON tasks(updated_at);
"#,
}];

pub fn open_connection(path: &str) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    configure_for_speed(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_for_speed(conn: &Connection) -> Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "temp_store", "MEMORY")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, now_utc_rfc3339()],
        )?;
    }

    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('schema_version', ?1)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()
}

pub fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting for UTC timestamp should never fail")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRow {
    pub id: String,
    pub payload: String,
    pub updated_at: String,
    pub dirty: bool,
}

pub struct UpsertRecord<'a> {
    pub id: &'a str,
    pub payload: &'a str,
    pub updated_at: &'a str,
    pub dirty: bool,
}

// Table names are interpolated into SQL, so they must come from the
// fixed entity list.
fn require_entity_table(table: &str) -> Result<()> {
    if ENTITY_TABLES.contains(&table) {
        Ok(())
    } else {
        Err(rusqlite::Error::InvalidQuery)
    }
}

pub fn upsert_record(conn: &Connection, table: &str, args: &UpsertRecord<'_>) -> Result<()> {
    require_entity_table(table)?;
    conn.execute(
        &format!(
            r#"
INSERT INTO {table} (id, payload, updated_at, dirty)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(id) DO UPDATE SET
    payload = excluded.payload,
    updated_at = excluded.updated_at,
    dirty = excluded.dirty
"#
        ),
        params![args.id, args.payload, args.updated_at, args.dirty as i64],
    )?;
    Ok(())
}

pub fn get_record(conn: &Connection, table: &str, id: &str) -> Result<Option<RecordRow>> {
    require_entity_table(table)?;
    conn.query_row(
        &format!("SELECT id, payload, updated_at, dirty FROM {table} WHERE id = ?1"),
        params![id],
        row_to_record,
    )
    .optional()
}

pub fn list_records(conn: &Connection, table: &str) -> Result<Vec<RecordRow>> {
    require_entity_table(table)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT id, payload, updated_at, dirty FROM {table} ORDER BY updated_at DESC, id ASC"
    ))?;
    let mut rows = stmt.query([])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(row_to_record(row)?);
    }
    Ok(result)
}

pub fn list_dirty_records(conn: &Connection, table: &str) -> Result<Vec<RecordRow>> {
    require_entity_table(table)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT id, payload, updated_at, dirty FROM {table} WHERE dirty = 1 ORDER BY id ASC"
    ))?;
    let mut rows = stmt.query([])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(row_to_record(row)?);
    }
    Ok(result)
}

pub fn mark_record_clean(conn: &Connection, table: &str, id: &str) -> Result<()> {
    require_entity_table(table)?;
    conn.execute(
        &format!("UPDATE {table} SET dirty = 0 WHERE id = ?1"),
        params![id],
    )?;
    Ok(())
}

pub fn delete_record(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    require_entity_table(table)?;
    let deleted = conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])?;
    Ok(deleted > 0)
}

pub fn count_records(conn: &Connection, table: &str) -> Result<u64> {
    require_entity_table(table)?;
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(count as u64)
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<RecordRow> {
    let dirty: i64 = row.get(3)?;
    Ok(RecordRow {
        id: row.get(0)?,
        payload: row.get(1)?,
        updated_at: row.get(2)?,
        dirty: dirty != 0,
    })
}

pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
        row.get(0)
    })
    .optional()
}

pub fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO meta (key, value)
VALUES (?1, ?2)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![key, value],
    )?;
    Ok(())
}

pub fn delete_meta(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM meta WHERE key = ?1", params![key])?;
    Ok(())
}
