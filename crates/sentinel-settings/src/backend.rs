use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

/// Durable key-value storage behind the settings cache.
///
/// Values are JSON documents keyed by a stable string (`chat:{tenant}:{chat}`,
/// `tenant:{tenant}`). Calls are synchronous and short; the cache invokes them
/// while holding only the lock of the record being written.
pub trait SettingsBackend: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Upsert `value` under `key`.
    fn store(&self, key: &str, value: &str) -> Result<()>;

    /// Every `(key, value)` whose key starts with `prefix`, ordered by key.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, String)>>;
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── in-memory ────────────────────────────────────────────────────────────────

/// Process-local backend. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl SettingsBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        Ok(lock(&self.entries)
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

// ── sqlite ───────────────────────────────────────────────────────────────────

/// Create the settings table. Safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS settings (
            key        TEXT PRIMARY KEY,
            value      TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )?;
    Ok(())
}

/// SQLite-backed store. Wraps a single connection in a `Mutex`.
pub struct SqliteBackend {
    db: Mutex<Connection>,
}

impl SqliteBackend {
    /// Wrap an open connection, creating the table if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }
}

impl SettingsBackend for SqliteBackend {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let db = lock(&self.db);
        let value = db
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn store(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = lock(&self.db);
        db.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let db = lock(&self.db);
        let mut stmt = db.prepare(
            "SELECT key, value FROM settings WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )?;
        let rows = stmt.query_map(params![prefix], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(backend: &dyn SettingsBackend) {
        assert_eq!(backend.load("chat:1:a").unwrap(), None);
        backend.store("chat:1:a", "{}").unwrap();
        backend.store("chat:1:b", "{\"x\":1}").unwrap();
        backend.store("tenant:1", "{}").unwrap();
        backend.store("chat:1:a", "{\"mode\":\"private\"}").unwrap();

        assert_eq!(
            backend.load("chat:1:a").unwrap().as_deref(),
            Some("{\"mode\":\"private\"}")
        );
        let chats = backend.scan("chat:").unwrap();
        let keys: Vec<&str> = chats.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["chat:1:a", "chat:1:b"]);
        assert_eq!(backend.scan("tenant:").unwrap().len(), 1);
        assert!(backend.scan("nothing:").unwrap().is_empty());
    }

    #[test]
    fn memory_backend_upserts_and_scans() {
        let backend = MemoryBackend::new();
        exercise(&backend);
        assert_eq!(backend.len(), 3);
    }

    #[test]
    fn sqlite_backend_upserts_and_scans() {
        let conn = Connection::open_in_memory().unwrap();
        let backend = SqliteBackend::new(conn).unwrap();
        exercise(&backend);
    }

    #[test]
    fn init_db_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        init_db(&conn).unwrap();
    }
}
