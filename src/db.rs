//! Local SQLite store for TokoSheet.
//!
//! Everything the app keeps on the device lives in one `local_settings`
//! table (category/key/value). The `local` category holds JSON caches of the
//! sheet tabs, so the app keeps working when the web app is unreachable or
//! was never configured.

use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::{PosError, PosResult};

/// Category for cached sheet data (`sales`, `purchases`, `products`, `cups`).
pub const CATEGORY_LOCAL: &str = "local";
/// Category for the web app endpoint.
pub const CATEGORY_REMOTE: &str = "remote";
/// Category for PIN hashes and login lockout state.
pub const CATEGORY_STAFF: &str = "staff";

/// Shared handle to the database connection.
pub struct DbState {
    pub conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Initialize the database at `{data_dir}/tokosheet.db`.
///
/// Creates the directory if needed, opens the connection, sets pragmas,
/// and runs any pending migrations. On corruption or open failure,
/// deletes the file and retries once.
pub fn init(data_dir: &Path) -> PosResult<DbState> {
    fs::create_dir_all(data_dir)
        .map_err(|e| PosError::Storage(format!("Failed to create data dir: {e}")))?;

    let db_path = data_dir.join("tokosheet.db");
    info!("Opening database at {}", db_path.display());

    let conn = match open_and_configure(&db_path).and_then(|c| run_migrations(&c).map(|_| c)) {
        Ok(c) => c,
        Err(first_err) => {
            warn!(
                "Database open failed ({}), deleting and retrying once",
                first_err
            );
            if db_path.exists() {
                let _ = fs::remove_file(&db_path);
                let _ = fs::remove_file(db_path.with_extension("db-wal"));
                let _ = fs::remove_file(db_path.with_extension("db-shm"));
            }
            let conn = open_and_configure(&db_path).map_err(|e| {
                PosError::Storage(format!("Database open failed after retry: {e}"))
            })?;
            run_migrations(&conn)?;
            conn
        }
    };

    info!("Database initialized (schema v{CURRENT_SCHEMA_VERSION})");

    Ok(DbState {
        conn: Mutex::new(conn),
        db_path,
    })
}

impl DbState {
    /// In-memory store with the schema applied. Used by tests and by the
    /// shell when no data directory is writable.
    pub fn in_memory() -> PosResult<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(DbState {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn lock(&self) -> PosResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PosError::Storage(format!("db lock poisoned: {e}")))
    }
}

/// Open the database file and apply pragmas.
fn open_and_configure(path: &Path) -> PosResult<Connection> {
    let conn = Connection::open(path).map_err(|e| PosError::Storage(format!("sqlite open: {e}")))?;

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|e| PosError::Storage(format!("pragma setup: {e}")))?;

    Ok(conn)
}

/// Run all pending migrations up to `CURRENT_SCHEMA_VERSION`.
fn run_migrations(conn: &Connection) -> PosResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| PosError::Storage(format!("create schema_version: {e}")))?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        info!("Database schema up to date (v{current})");
        return Ok(());
    }

    info!("Migrating database from v{current} to v{CURRENT_SCHEMA_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Migration v1: key/value store.
fn migrate_v1(conn: &Connection) -> PosResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS local_settings (
            id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
            setting_category TEXT NOT NULL,
            setting_key TEXT NOT NULL,
            setting_value TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            UNIQUE(setting_category, setting_key)
        );

        INSERT INTO schema_version (version) VALUES (1);
        ",
    )
    .map_err(|e| {
        error!("Migration v1 failed: {e}");
        PosError::Storage(format!("migration v1: {e}"))
    })?;

    info!("Applied migration v1 (local_settings table)");
    Ok(())
}

// ---------------------------------------------------------------------------
// Settings helpers
// ---------------------------------------------------------------------------

/// Get a single setting value.
pub fn get_setting(conn: &Connection, category: &str, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT setting_value FROM local_settings WHERE setting_category = ?1 AND setting_key = ?2",
        params![category, key],
        |row| row.get(0),
    )
    .ok()
}

/// Insert or update a setting.
pub fn set_setting(conn: &Connection, category: &str, key: &str, value: &str) -> PosResult<()> {
    conn.execute(
        "INSERT INTO local_settings (setting_category, setting_key, setting_value, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(setting_category, setting_key) DO UPDATE SET
            setting_value = excluded.setting_value,
            updated_at = excluded.updated_at",
        params![category, key, value],
    )
    .map_err(|e| PosError::Storage(format!("set_setting: {e}")))?;
    Ok(())
}


// ---------------------------------------------------------------------------
// DbState convenience wrappers
// ---------------------------------------------------------------------------

pub fn read_setting(db: &DbState, category: &str, key: &str) -> PosResult<Option<String>> {
    let conn = db.lock()?;
    Ok(get_setting(&conn, category, key))
}

pub fn write_setting(db: &DbState, category: &str, key: &str, value: &str) -> PosResult<()> {
    let conn = db.lock()?;
    set_setting(&conn, category, key, value)
}

/// Read a cached JSON document from the `local` category.
///
/// Returns `None` when the key is missing. A cache entry that no longer
/// parses is logged and treated as missing.
pub fn read_local_json<T: DeserializeOwned>(db: &DbState, key: &str) -> PosResult<Option<T>> {
    let raw = read_setting(db, CATEGORY_LOCAL, key)?;
    match raw {
        Some(raw) => match serde_json::from_str::<T>(&raw) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                warn!(key, error = %e, "local cache entry is not valid JSON, ignoring");
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

/// Read a cached JSON array, empty when missing.
pub fn read_local_list<T: DeserializeOwned>(db: &DbState, key: &str) -> PosResult<Vec<T>> {
    Ok(read_local_json::<Vec<T>>(db, key)?.unwrap_or_default())
}

pub fn write_local_json<T: Serialize + ?Sized>(db: &DbState, key: &str, value: &T) -> PosResult<()> {
    let raw = serde_json::to_string(value)?;
    write_setting(db, CATEGORY_LOCAL, key, &raw)
}

pub fn has_local(db: &DbState, key: &str) -> PosResult<bool> {
    Ok(read_setting(db, CATEGORY_LOCAL, key)?.is_some())
}

// ===========================================================================
// Tests
// ===========================================================================
