use crate::error::{GuardError, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared SQLite handle.
///
/// Every query runs on the blocking pool so storage I/O never stalls the
/// event loop; callers see an `async` API that may suspend.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                GuardError::Storage(format!(
                    "Failed to create data directory `{}`: {err}",
                    parent.display()
                ))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|err| GuardError::Storage(format!("Failed to open SQLite: {err}")))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|err| GuardError::Storage(format!("Failed to set SQLite journal mode: {err}")))?;

        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|err| GuardError::Storage(format!("Failed to open SQLite: {err}")))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    pub async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&conn)
        })
        .await
        .map_err(|err| GuardError::Storage(format!("SQLite task failed: {err}")))?
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS app_state (
         state_key TEXT PRIMARY KEY,
         state_json TEXT NOT NULL,
         updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now'))
       );
       CREATE TABLE IF NOT EXISTS allowed_urls (
         url TEXT PRIMARY KEY,
         allowed INTEGER NOT NULL,
         created_at INTEGER NOT NULL,
         expires_at INTEGER
       );",
    )
    .map_err(|err| GuardError::Storage(format!("Failed to initialize SQLite schema: {err}")))
}

pub fn upsert_state(conn: &Connection, key: &str, state_json: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO app_state (state_key, state_json, updated_at)
       VALUES (?1, ?2, strftime('%s','now'))
       ON CONFLICT(state_key)
       DO UPDATE SET
         state_json = excluded.state_json,
         updated_at = excluded.updated_at;",
        params![key, state_json],
    )
    .map_err(|err| GuardError::Storage(format!("Failed to save `{key}` to SQLite: {err}")))?;

    Ok(())
}

pub fn load_state(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT state_json FROM app_state WHERE state_key = ?1 LIMIT 1;",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .map_err(|err| GuardError::Storage(format!("Failed to load `{key}` from SQLite: {err}")))
}
