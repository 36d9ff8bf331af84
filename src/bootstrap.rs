use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

use crate::db::{
    self, count_records, list_dirty_records, list_records, mark_record_clean, set_meta,
    upsert_record, RecordRow, UpsertRecord, ENTITY_TABLES,
};
use crate::domain::user::{hash_password, User, UserRole};
use crate::domain::Entity;
use crate::remote::RemoteStore;

pub const LAST_REFRESH_META_KEY: &str = "last_refresh_at";
pub const DEGRADED_META_KEY: &str = "last_refresh_degraded";

pub const FALLBACK_ADMIN_ID: &str = "usr-admin";
pub const FALLBACK_ADMIN_USERNAME: &str = "admin";
pub const FALLBACK_ADMIN_PASSWORD: &str = "admin";

/// Local admin installed whenever the user list cannot be fetched or
/// comes back empty, so the cache is never a lockout.
pub fn fallback_admin() -> User {
    User {
        id: FALLBACK_ADMIN_ID.to_string(),
        username: FALLBACK_ADMIN_USERNAME.to_string(),
        display_name: "Local Admin".to_string(),
        role: UserRole::Admin,
        password_sha256: hash_password(FALLBACK_ADMIN_PASSWORD),
        active: true,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedRecord {
    pub id: String,
    pub payload: String,
    pub from_remote: bool,
}

/// Merge one table: the backend wins per id, rows that exist only in
/// the cache survive untouched.
pub fn merge_records(local: &[RecordRow], remote: &[Value]) -> Vec<MergedRecord> {
    let mut merged: Vec<MergedRecord> = Vec::with_capacity(local.len() + remote.len());
    for row in remote {
        let Some(id) = row.get("id").and_then(Value::as_str) else {
            continue;
        };
        merged.push(MergedRecord {
            id: id.to_string(),
            payload: row.to_string(),
            from_remote: true,
        });
    }
    for row in local {
        if merged.iter().any(|record| record.id == row.id) {
            continue;
        }
        merged.push(MergedRecord {
            id: row.id.clone(),
            payload: row.payload.clone(),
            from_remote: false,
        });
    }
    merged
}

#[derive(Debug, Clone, Serialize)]
pub struct TableRefresh {
    pub table: &'static str,
    pub fetched: usize,
    pub kept_local: usize,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub tables: Vec<TableRefresh>,
    pub fallback_admin_installed: bool,
}

impl RefreshSummary {
    pub fn is_fully_synced(&self) -> bool {
        self.tables.iter().all(|table| !table.degraded)
    }
}

/// Pull every table from the backend into the cache. Unreachable or
/// failing tables are marked degraded and the cached rows stand in.
pub fn refresh(
    conn: &Connection,
    remote: Option<&RemoteStore>,
) -> Result<RefreshSummary, rusqlite::Error> {
    let mut tables = Vec::with_capacity(ENTITY_TABLES.len());

    for table in ENTITY_TABLES {
        let outcome = match remote {
            Some(store) => store.select_all(table),
            None => {
                tables.push(TableRefresh {
                    table,
                    fetched: 0,
                    kept_local: count_records(conn, table)? as usize,
                    degraded: true,
                    error: Some("backend is not configured".to_string()),
                });
                continue;
            }
        };

        match outcome {
            Ok(rows) => {
                let local = list_records(conn, table)?;
                let merged = merge_records(&local, &rows);
                let fetched = merged.iter().filter(|record| record.from_remote).count();
                let kept_local = merged.len() - fetched;
                let now = db::now_utc_rfc3339();
                for record in &merged {
                    if !record.from_remote {
                        continue;
                    }
                    let updated_at = payload_updated_at(&record.payload).unwrap_or_else(|| now.clone());
                    upsert_record(
                        conn,
                        table,
                        &UpsertRecord {
                            id: &record.id,
                            payload: &record.payload,
                            updated_at: &updated_at,
                            dirty: false,
                        },
                    )?;
                }
                tables.push(TableRefresh {
                    table,
                    fetched,
                    kept_local,
                    degraded: false,
                    error: None,
                });
            }
            Err(err) => {
                tables.push(TableRefresh {
                    table,
                    fetched: 0,
                    kept_local: count_records(conn, table)? as usize,
                    degraded: true,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    let fallback_admin_installed = ensure_fallback_admin(conn)?;
    set_meta(conn, LAST_REFRESH_META_KEY, &db::now_utc_rfc3339())?;
    // The flag survives the process so `hemp doctor` can report it.
    if tables.iter().any(|table| table.degraded) {
        set_meta(conn, DEGRADED_META_KEY, "1")?;
    } else {
        db::delete_meta(conn, DEGRADED_META_KEY)?;
    }

    Ok(RefreshSummary {
        tables,
        fallback_admin_installed,
    })
}

// Installed only when the cache holds no users at all, whether the
// fetch failed or the table is genuinely empty. Not marked dirty so it
// never leaks to the backend.
fn ensure_fallback_admin(conn: &Connection) -> Result<bool, rusqlite::Error> {
    if count_records(conn, User::TABLE)? > 0 {
        return Ok(false);
    }

    let admin = fallback_admin();
    let payload = match serde_json::to_string(&admin) {
        Ok(payload) => payload,
        Err(_) => return Ok(false),
    };
    upsert_record(
        conn,
        User::TABLE,
        &UpsertRecord {
            id: FALLBACK_ADMIN_ID,
            payload: &payload,
            updated_at: &db::now_utc_rfc3339(),
            dirty: false,
        },
    )?;
    Ok(true)
}

fn payload_updated_at(payload: &str) -> Option<String> {
    let value: Value = serde_json::from_str(payload).ok()?;
    value
        .get("updated_at")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[derive(Debug, Clone, Serialize)]
pub struct PushSummary {
    pub pushed: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl PushSummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Push every dirty cached row to the backend as an upsert, marking it
/// clean on success. Failures leave the row dirty for the next push.
pub fn push(conn: &Connection, remote: &RemoteStore) -> Result<PushSummary, rusqlite::Error> {
    let mut summary = PushSummary {
        pushed: 0,
        failed: 0,
        errors: Vec::new(),
    };

    for table in ENTITY_TABLES {
        for row in list_dirty_records(conn, table)? {
            let payload: Value = match serde_json::from_str(&row.payload) {
                Ok(payload) => payload,
                Err(err) => {
                    summary.failed += 1;
                    summary
                        .errors
                        .push(format!("{table}/{}: unreadable cached payload: {err}", row.id));
                    continue;
                }
            };
            match remote.upsert(table, &payload) {
                Ok(()) => {
                    mark_record_clean(conn, table, &row.id)?;
                    summary.pushed += 1;
                }
                Err(err) => {
                    summary.failed += 1;
                    summary.errors.push(format!("{table}/{}: {err}", row.id));
                }
            }
        }
    }

    Ok(summary)
}
