//! SQLite storage backend

use super::traits::{AnnotationStore, CacheEntry, OpenStore, StoreError, StoreResult};
use crate::config::ProviderConfig;
use crate::provider::{Sentiment, SentimentLabel};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Settings key for the provider configuration
const CONFIG_KEY: &str = "sentimentConfig";
/// Settings key for the highlighting toggle
const ENABLED_KEY: &str = "highlightEnabled";

/// SQLite-backed annotation store
///
/// A single database file with one table for cached classifications and one
/// for settings. Thread-safe via an internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS annotations (
                fingerprint TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                score REAL NOT NULL,
                stored_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value_json TEXT NOT NULL
            );

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert with an explicit timestamp. `insert` delegates here with the
    /// current time; tests use it to age entries past their TTL.
    pub fn insert_at(
        &self,
        fingerprint: &str,
        result: &Sentiment,
        stored_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO annotations (fingerprint, label, score, stored_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                fingerprint,
                result.label.as_str(),
                result.score as f64,
                stored_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn parse_entry(label: String, score: f64, stored_at: String) -> StoreResult<CacheEntry> {
        let label = SentimentLabel::from_raw(&label)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown label '{label}'")))?;
        let stored_at = DateTime::parse_from_rfc3339(&stored_at)
            .map_err(|e| StoreError::DateParse(e.to_string()))?
            .with_timezone(&Utc);
        Ok(CacheEntry {
            result: Sentiment::new(label, score as f32),
            stored_at,
        })
    }

    fn load_setting(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row(
                "SELECT value_json FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn save_setting(&self, key: &str, value_json: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value_json) VALUES (?1, ?2)",
            params![key, value_json],
        )?;
        Ok(())
    }
}

impl AnnotationStore for SqliteStore {
    fn lookup(&self, fingerprint: &str, ttl: Duration) -> StoreResult<Option<Sentiment>> {
        match self.entry(fingerprint)? {
            Some(entry) if entry.is_expired(Utc::now(), ttl) => {
                self.remove(fingerprint)?;
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.result)),
            None => Ok(None),
        }
    }

    fn entry(&self, fingerprint: &str) -> StoreResult<Option<CacheEntry>> {
        let row = {
            let conn = self.conn.lock().unwrap();
            conn.query_row(
                "SELECT label, score, stored_at FROM annotations WHERE fingerprint = ?1",
                params![fingerprint],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?
        };
        match row {
            Some((label, score, stored_at)) => {
                Ok(Some(Self::parse_entry(label, score, stored_at)?))
            }
            None => Ok(None),
        }
    }

    fn insert(&self, fingerprint: &str, result: &Sentiment) -> StoreResult<()> {
        self.insert_at(fingerprint, result, Utc::now())
    }

    fn remove(&self, fingerprint: &str) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM annotations WHERE fingerprint = ?1",
            params![fingerprint],
        )?;
        Ok(removed > 0)
    }

    fn entry_count(&self) -> StoreResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM annotations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn clear(&self) -> StoreResult<usize> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute("DELETE FROM annotations", [])?;
        Ok(removed)
    }

    fn load_config(&self) -> StoreResult<Option<ProviderConfig>> {
        match self.load_setting(CONFIG_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_config(&self, config: &ProviderConfig) -> StoreResult<()> {
        self.save_setting(CONFIG_KEY, &serde_json::to_string(config)?)
    }

    fn load_enabled(&self) -> StoreResult<Option<bool>> {
        match self.load_setting(ENABLED_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_enabled(&self, enabled: bool) -> StoreResult<()> {
        self.save_setting(ENABLED_KEY, &serde_json::to_string(&enabled)?)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }
}
