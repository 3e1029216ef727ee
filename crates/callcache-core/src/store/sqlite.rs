//! SQLite-backed record store.

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use super::RecordStore;
use crate::error::{LookupError, Result};
use crate::models::{normalize_call_sign, CallsignEntry};

/// Current schema version. Bump whenever the table layout changes; older
/// databases are dropped and rebuilt on open.
const SCHEMA_VERSION: i32 = 1;

const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS callsigns (
        call_sign TEXT PRIMARY KEY,
        call_sign_upper TEXT NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_callsigns_upper ON callsigns(call_sign_upper);

    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
"#;

enum Location {
    File(PathBuf),
    Memory,
}

/// Record store backed by a single SQLite connection.
///
/// The store starts closed; `open` connects and migrates the schema.
pub struct SqliteStore {
    location: Location,
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            location: Location::File(path),
            conn: Mutex::new(None),
        }
    }

    /// Store that lives only as long as this value. Used by tests.
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            conn: Mutex::new(None),
        }
    }

    fn connect(&self) -> Result<Connection> {
        match &self.location {
            Location::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        LookupError::StorageUnavailable(format!(
                            "Failed to create {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
                let conn = Connection::open(path).map_err(|e| {
                    LookupError::StorageUnavailable(format!(
                        "Failed to open {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                // WAL lets readers proceed while a batch is being written
                conn.execute_batch("PRAGMA journal_mode=WAL;")
                    .map_err(|e| LookupError::StorageUnavailable(e.to_string()))?;
                Ok(conn)
            }
            Location::Memory => Connection::open_in_memory()
                .map_err(|e| LookupError::StorageUnavailable(e.to_string())),
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| LookupError::StorageIo("Connection mutex poisoned".to_string()))?;
        let conn = guard
            .as_mut()
            .ok_or_else(|| LookupError::StorageIo("Store is not open".to_string()))?;
        f(conn)
    }
}

/// Bring the schema up to `SCHEMA_VERSION`.
fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")
        .map_err(|e| LookupError::StorageUnavailable(e.to_string()))?;

    let current: Option<i32> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;

    let tx = conn.transaction()?;
    match current {
        Some(version) if version == SCHEMA_VERSION => return Ok(()),
        Some(version) if version > SCHEMA_VERSION => {
            return Err(LookupError::StorageUnavailable(format!(
                "Database schema version {} is newer than supported version {}",
                version, SCHEMA_VERSION
            )));
        }
        Some(version) => {
            warn!(from = version, to = SCHEMA_VERSION, "Rebuilding callsign database schema");
            tx.execute_batch("DROP TABLE IF EXISTS callsigns; DROP TABLE IF EXISTS meta;")?;
        }
        None => debug!(version = SCHEMA_VERSION, "Creating callsign database schema"),
    }

    tx.execute_batch(SCHEMA_SQL)?;
    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        params![SCHEMA_VERSION],
    )?;
    tx.commit()?;
    Ok(())
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<CallsignEntry> {
    Ok(CallsignEntry {
        call_sign: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
    })
}

impl RecordStore for SqliteStore {
    fn open(&self) -> Result<()> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| LookupError::StorageUnavailable("Connection mutex poisoned".to_string()))?;
        if guard.is_none() {
            *guard = Some(self.connect()?);
            if let Location::File(path) = &self.location {
                info!(path = %path.display(), "Opened callsign database");
            }
        }
        match guard.as_mut() {
            Some(conn) => migrate(conn),
            None => Err(LookupError::StorageUnavailable("Connection missing after open".to_string())),
        }
    }

    fn get_by_key(&self, call_sign: &str) -> Result<Option<CallsignEntry>> {
        self.with_conn(|conn| {
            let entry = conn
                .query_row(
                    "SELECT call_sign, first_name, last_name FROM callsigns WHERE call_sign = ?1",
                    params![call_sign],
                    entry_from_row,
                )
                .optional()?;
            Ok(entry)
        })
    }

    fn range_by_normalized(
        &self,
        low: &str,
        high: &str,
        limit: usize,
    ) -> Result<Vec<CallsignEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT call_sign, first_name, last_name FROM callsigns
                 WHERE call_sign_upper >= ?1 AND call_sign_upper <= ?2
                 ORDER BY call_sign_upper, call_sign
                 LIMIT ?3",
            )?;
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let rows = stmt.query_map(params![low, high, limit], entry_from_row)?;
            let entries = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
    }

    fn scan_all(&self, visit: &mut dyn FnMut(CallsignEntry) -> ControlFlow<()>) -> Result<()> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached("SELECT call_sign, first_name, last_name FROM callsigns")?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                if visit(entry_from_row(row)?).is_break() {
                    break;
                }
            }
            Ok(())
        })
    }

    fn write_batch(&self, entries: &[CallsignEntry]) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT OR REPLACE INTO callsigns (call_sign, call_sign_upper, first_name, last_name)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for entry in entries {
                    let call_sign = normalize_call_sign(&entry.call_sign);
                    let upper = call_sign.to_uppercase();
                    stmt.execute(params![call_sign, upper, entry.first_name, entry.last_name])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn clear_all(&self) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute_batch("DELETE FROM callsigns; DELETE FROM meta;")?;
            tx.commit()?;
            Ok(())
        })
    }

    fn get_meta(&self, key: &str) -> Result<Option<serde_json::Value>> {
        self.with_conn(|conn| {
            let raw: Option<String> = conn
                .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| row.get(0))
                .optional()?;
            match raw {
                Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
                None => Ok(None),
            }
        })
    }

    fn set_meta(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO meta (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, raw, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
    }

    fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM callsigns", [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
    }
}
