use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::bootstrap::{self, PushSummary, RefreshSummary};
use crate::db::{
    self, delete_record, get_meta, get_record, list_records, mark_record_clean, set_meta,
    upsert_record, UpsertRecord,
};
use crate::domain::user::User;
use crate::domain::{Entity, ParseValueError};
use crate::record_id::generate_record_id;
use crate::remote::{BackendError, RemoteStore};
use crate::settings::{Settings, SettingsError};

pub const WORKSPACE_DIR: &str = ".hempapp";
pub const CACHE_FILE: &str = "cache.sqlite";
pub const SETTINGS_FILE: &str = "settings.toml";

const SESSION_META_KEY: &str = "session_user";

/// One opened workspace: the SQLite cache, the settings file next to
/// it, and the backend client when a url/key pair resolves.
pub struct App {
    conn: Connection,
    remote: Option<RemoteStore>,
    settings: Settings,
    settings_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    /// False means the row is cached dirty and waits for `hemp push`.
    pub synced: bool,
}

impl App {
    /// Open (creating if needed) the workspace under `root`.
    pub fn open(root: &Path) -> Result<Self, AppError> {
        let workspace = root.join(WORKSPACE_DIR);
        std::fs::create_dir_all(&workspace)?;

        let settings_path = workspace.join(SETTINGS_FILE);
        let settings = Settings::load(&settings_path)?;
        let remote = settings.resolve_backend().map(RemoteStore::new);

        let cache_path = workspace.join(CACHE_FILE);
        let conn = db::open_connection(&cache_path.display().to_string())?;

        Ok(Self {
            conn,
            remote,
            settings,
            settings_path,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn remote(&self) -> Option<&RemoteStore> {
        self.remote.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub fn update_settings<F>(&mut self, apply: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut Settings),
    {
        apply(&mut self.settings);
        self.settings.save(&self.settings_path)?;
        self.remote = self.settings.resolve_backend().map(RemoteStore::new);
        Ok(())
    }

    /// Fresh id for a new record, collision-checked against the cache.
    pub fn next_id<E: Entity>(&self) -> String {
        generate_record_id(E::ID_PREFIX, |candidate| {
            matches!(get_record(&self.conn, E::TABLE, candidate), Ok(Some(_)))
        })
    }

    /// Cache-first write: the row lands dirty before the backend is
    /// touched, so an interrupted backend call never loses the write.
    /// The upsert is attempted immediately and the row is marked clean
    /// on success; otherwise `push` retries later.
    pub fn save<E: Entity>(&self, entity: &E) -> Result<SaveOutcome, AppError> {
        let payload = serde_json::to_value(entity)?;
        let payload_text = payload.to_string();
        let updated_at = payload
            .get("updated_at")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(db::now_utc_rfc3339);

        upsert_record(
            &self.conn,
            E::TABLE,
            &UpsertRecord {
                id: entity.id(),
                payload: &payload_text,
                updated_at: &updated_at,
                dirty: true,
            },
        )?;

        let synced = match &self.remote {
            Some(remote) => remote.upsert(E::TABLE, &payload).is_ok(),
            None => false,
        };
        if synced {
            mark_record_clean(&self.conn, E::TABLE, entity.id())?;
        }
        Ok(SaveOutcome { synced })
    }

    /// Look up one record. A bare suffix like `3f9a` is retried with
    /// the table prefix, so `plot show 3f9a` finds `plt-3f9a`.
    pub fn get<E: Entity>(&self, id: &str) -> Result<Option<E>, AppError> {
        let row = match get_record(&self.conn, E::TABLE, id)? {
            Some(row) => Some(row),
            None => get_record(&self.conn, E::TABLE, &format!("{}-{}", E::ID_PREFIX, id))?,
        };
        let Some(row) = row else {
            return Ok(None);
        };
        let entity: E = serde_json::from_str(&row.payload)?;
        Ok(Some(entity))
    }

    pub fn require<E: Entity>(&self, id: &str) -> Result<E, AppError> {
        self.get::<E>(id)?.ok_or_else(|| AppError::NotFound {
            table: E::TABLE,
            id: id.to_string(),
        })
    }

    /// All records of one table, newest update first. Rows whose cached
    /// payload no longer deserializes are skipped.
    pub fn list<E: Entity>(&self) -> Result<Vec<E>, AppError> {
        let rows = list_records(&self.conn, E::TABLE)?;
        let mut entities = Vec::with_capacity(rows.len());
        for row in rows {
            if let Ok(entity) = serde_json::from_str::<E>(&row.payload) {
                entities.push(entity);
            }
        }
        Ok(entities)
    }

    /// Delete from the cache and forward to the backend best-effort.
    /// There are no tombstones; an unreachable backend means the row
    /// can come back on the next refresh.
    pub fn delete<E: Entity>(&self, id: &str) -> Result<bool, AppError> {
        let resolved = match get_record(&self.conn, E::TABLE, id)? {
            Some(row) => row.id,
            None => {
                let prefixed = format!("{}-{}", E::ID_PREFIX, id);
                match get_record(&self.conn, E::TABLE, &prefixed)? {
                    Some(row) => row.id,
                    None => return Ok(false),
                }
            }
        };

        let deleted = delete_record(&self.conn, E::TABLE, &resolved)?;
        if deleted {
            if let Some(remote) = &self.remote {
                let _ = remote.delete(E::TABLE, &resolved);
            }
        }
        Ok(deleted)
    }

    pub fn refresh(&self) -> Result<RefreshSummary, AppError> {
        Ok(bootstrap::refresh(&self.conn, self.remote.as_ref())?)
    }

    pub fn push(&self) -> Result<PushSummary, AppError> {
        let remote = self.remote.as_ref().ok_or(AppError::BackendNotConfigured)?;
        Ok(bootstrap::push(&self.conn, remote)?)
    }

    /// Verify credentials against cached users and record the session.
    pub fn login(&self, username: &str, password: &str) -> Result<User, AppError> {
        let users = self.list::<User>()?;
        let user = users
            .into_iter()
            .find(|user| user.username == username)
            .filter(|user| user.verify_password(password))
            .ok_or(AppError::AuthFailed)?;
        set_meta(&self.conn, SESSION_META_KEY, &user.id)?;
        Ok(user)
    }

    pub fn logout(&self) -> Result<bool, AppError> {
        let had_session = get_meta(&self.conn, SESSION_META_KEY)?.is_some();
        db::delete_meta(&self.conn, SESSION_META_KEY)?;
        Ok(had_session)
    }

    pub fn current_user(&self) -> Result<Option<User>, AppError> {
        let Some(user_id) = get_meta(&self.conn, SESSION_META_KEY)? else {
            return Ok(None);
        };
        self.get::<User>(&user_id)
    }
}

#[derive(Debug)]
pub enum AppError {
    Db(rusqlite::Error),
    Settings(SettingsError),
    Backend(BackendError),
    Payload(serde_json::Error),
    Parse(ParseValueError),
    NotFound { table: &'static str, id: String },
    AuthFailed,
    BackendNotConfigured,
    AdvisorNotConfigured,
    Io(std::io::Error),
    Invalid(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(err) => write!(f, "cache error: {}", err),
            AppError::Settings(err) => write!(f, "{}", err),
            AppError::Backend(err) => write!(f, "{}", err),
            AppError::Payload(err) => write!(f, "record payload error: {}", err),
            AppError::Parse(err) => write!(f, "{}", err),
            AppError::NotFound { table, id } => {
                write!(f, "no record '{}' in {}", id, table)
            }
            AppError::AuthFailed => write!(f, "invalid username or password"),
            AppError::BackendNotConfigured => {
                write!(f, "backend is not configured (run 'hemp config backend')")
            }
            AppError::AdvisorNotConfigured => {
                write!(f, "advisor api key is not configured")
            }
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Invalid(message) => write!(f, "{}", message),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Db(err) => Some(err),
            AppError::Settings(err) => Some(err),
            AppError::Backend(err) => Some(err),
            AppError::Payload(err) => Some(err),
            AppError::Parse(err) => Some(err),
            AppError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<SettingsError> for AppError {
    fn from(value: SettingsError) -> Self {
        AppError::Settings(value)
    }
}

impl From<BackendError> for AppError {
    fn from(value: BackendError) -> Self {
        AppError::Backend(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::Payload(value)
    }
}

impl From<ParseValueError> for AppError {
    fn from(value: ParseValueError) -> Self {
        AppError::Parse(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

#[cfg(test)]
mod tests;
