use super::sqlite::Database;
use crate::abstractions::allowlist::now_secs;
use crate::abstractions::{AllowlistEntry, AllowlistStore};
use crate::error::{GuardError, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Allowlist persisted in the `allowed_urls` table.
///
/// Concurrent writers are not coordinated beyond SQLite itself: the last
/// write for a URL wins.
#[derive(Clone)]
pub struct SqliteAllowlist {
    db: Database,
    ttl: Option<Duration>,
}

impl SqliteAllowlist {
    pub fn new(db: Database, ttl: Option<Duration>) -> Self {
        Self { db, ttl }
    }

    /// Import an `allowedUrls` object (`{url: bool}`) as exported from the
    /// extension's local storage. Only truthy values are imported.
    pub async fn import_json(&self, raw: &str) -> Result<usize> {
        let map: BTreeMap<String, serde_json::Value> = serde_json::from_str(raw)
            .map_err(|err| GuardError::InvalidInput(format!("Invalid allowedUrls JSON: {err}")))?;

        let entries: Vec<AllowlistEntry> = map
            .into_iter()
            .filter(|(url, value)| !url.is_empty() && is_truthy(value))
            .map(|(url, _)| AllowlistEntry::new(url, self.ttl))
            .collect();
        let count = entries.len();

        self.db
            .with_conn(move |conn| {
                for entry in &entries {
                    upsert_entry(conn, entry)?;
                }
                Ok(())
            })
            .await?;
        Ok(count)
    }

    /// Export active entries in the same `{url: true}` shape.
    pub async fn export_json(&self) -> Result<String> {
        let entries = self.list().await?;
        let map: BTreeMap<String, bool> = entries
            .into_iter()
            .filter(AllowlistEntry::is_active)
            .map(|entry| (entry.url, true))
            .collect();
        Ok(serde_json::to_string_pretty(&map)?)
    }

    /// Delete expired rows. Returns how many were removed.
    pub async fn purge_expired(&self) -> Result<usize> {
        let now = now_secs();
        self.db
            .with_conn(move |conn| {
                conn.execute(
                    "DELETE FROM allowed_urls WHERE expires_at IS NOT NULL AND expires_at <= ?1;",
                    params![now],
                )
                .map_err(|err| GuardError::Storage(format!("Failed to purge allowlist: {err}")))
            })
            .await
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Null => false,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn upsert_entry(conn: &Connection, entry: &AllowlistEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO allowed_urls (url, allowed, created_at, expires_at)
       VALUES (?1, ?2, ?3, ?4)
       ON CONFLICT(url)
       DO UPDATE SET
         allowed = excluded.allowed,
         created_at = excluded.created_at,
         expires_at = excluded.expires_at;",
        params![entry.url, entry.allowed, entry.created_at, entry.expires_at],
    )
    .map_err(|err| GuardError::Storage(format!("Failed to save allowlist entry: {err}")))?;
    Ok(())
}

fn load_entry(conn: &Connection, url: &str) -> Result<Option<AllowlistEntry>> {
    conn.query_row(
        "SELECT url, allowed, created_at, expires_at FROM allowed_urls WHERE url = ?1 LIMIT 1;",
        params![url],
        |row| {
            Ok(AllowlistEntry {
                url: row.get(0)?,
                allowed: row.get(1)?,
                created_at: row.get(2)?,
                expires_at: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(|err| GuardError::Storage(format!("Failed to read allowlist: {err}")))
}

impl AllowlistStore for SqliteAllowlist {
    fn is_allowed(&self, url: &str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        let url = url.to_string();
        Box::pin(async move {
            let entry = self.db.with_conn(move |conn| load_entry(conn, &url)).await?;
            Ok(entry.is_some_and(|entry| entry.is_active()))
        })
    }

    fn allow(&self, url: &str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let entry = AllowlistEntry::new(url, self.ttl);
        Box::pin(async move {
            self.db
                .with_conn(move |conn| upsert_entry(conn, &entry))
                .await
        })
    }

    fn revoke(&self, url: &str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        let url = url.to_string();
        Box::pin(async move {
            self.db
                .with_conn(move |conn| {
                    let removed = conn
                        .execute("DELETE FROM allowed_urls WHERE url = ?1;", params![url])
                        .map_err(|err| {
                            GuardError::Storage(format!("Failed to revoke allowlist entry: {err}"))
                        })?;
                    Ok(removed > 0)
                })
                .await
        })
    }

    fn list(&self) -> Pin<Box<dyn Future<Output = Result<Vec<AllowlistEntry>>> + Send + '_>> {
        Box::pin(async move {
            self.db
                .with_conn(|conn| {
                    let mut stmt = conn.prepare(
                        "SELECT url, allowed, created_at, expires_at FROM allowed_urls ORDER BY url;",
                    )?;
                    let rows = stmt.query_map([], |row| {
                        Ok(AllowlistEntry {
                            url: row.get(0)?,
                            allowed: row.get(1)?,
                            created_at: row.get(2)?,
                            expires_at: row.get(3)?,
                        })
                    })?;
                    let entries = rows.collect::<std::result::Result<Vec<_>, _>>()?;
                    Ok(entries)
                })
                .await
        })
    }
}
