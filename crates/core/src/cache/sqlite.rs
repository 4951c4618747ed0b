//! SQLite-backed cache, for deployments where the mirror should survive restarts.
//!
//! rusqlite is synchronous, so every statement runs on the blocking pool.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{CacheError, CacheStore};

/// SQLite-backed cache store.
pub struct SqliteCache {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCache {
    /// Open (or create) the cache database at `path`.
    pub fn new(path: &Path) -> Result<Self, CacheError> {
        let conn = Connection::open(path).map_err(|e| CacheError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory SQLite cache (useful for testing).
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CacheError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CacheError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cache_entries_expires ON cache_entries(expires_at);
            "#,
        )
        .map_err(|e| CacheError::Database(e.to_string()))?;

        Ok(())
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, CacheError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| CacheError::Database("connection lock poisoned".to_string()))?;
            f(&conn).map_err(|e| CacheError::Database(e.to_string()))
        })
        .await
        .map_err(|e| CacheError::Database(e.to_string()))?
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Expiry timestamp for an entry written now, saturating on huge TTLs.
    fn expires_at(ttl: Duration) -> i64 {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        Self::now_ms().saturating_add(ttl_ms)
    }
}

#[async_trait]
impl CacheStore for SqliteCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        let key = key.to_string();
        let now = Self::now_ms();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT value FROM cache_entries WHERE key = ? AND expires_at > ?",
                params![key, now],
                |row| row.get(0),
            )
            .optional()
        })
        .await
    }

    async fn set_raw(&self, key: &str, ttl: Duration, value: String) -> Result<(), CacheError> {
        let key = key.to_string();
        let expires_at = Self::expires_at(ttl);
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)",
                params![key, value, expires_at],
            )
        })
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let key = key.to_string();
        let removed = self
            .with_conn(move |conn| {
                conn.execute("DELETE FROM cache_entries WHERE key = ?", params![key])
            })
            .await?;
        Ok(removed > 0)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        let key = key.to_string();
        let now = Self::now_ms();
        let expires_at: Option<i64> = self
            .with_conn(move |conn| {
                conn.query_row(
                    "SELECT expires_at FROM cache_entries WHERE key = ? AND expires_at > ?",
                    params![key, now],
                    |row| row.get(0),
                )
                .optional()
            })
            .await?;
        Ok(expires_at.map(|at| Duration::from_millis(at.saturating_sub(now) as u64)))
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        self.with_conn(|conn| conn.execute("DELETE FROM cache_entries", []))
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Self::now_ms();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM cache_entries WHERE expires_at <= ?", params![now])
        })
        .await
    }
}
