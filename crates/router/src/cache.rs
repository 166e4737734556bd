//! Answer cache: fingerprint-keyed store of resolved questions.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use strictqa_core::{AppError, AppResult};

/// A cached resolution, positive or negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub question: String,
    pub answer: String,
    pub context: String,
    pub sources: Vec<String>,
    /// Calculation category when a calculation service answered
    #[serde(default)]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One line of the operation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub operation: String,
    pub details: String,
    pub elapsed_secs: f64,
    pub recorded_at: DateTime<Utc>,
}

impl OperationRecord {
    pub fn new(operation: impl Into<String>, details: impl Into<String>, elapsed_secs: f64) -> Self {
        Self {
            operation: operation.into(),
            details: details.into(),
            elapsed_secs,
            recorded_at: Utc::now(),
        }
    }
}

/// Persistent store for resolved answers.
pub trait CacheStore: Send + Sync {
    fn get(&self, fingerprint: &str) -> AppResult<Option<CacheEntry>>;

    /// Insert or replace the entry for `entry.fingerprint`. Last write wins.
    fn upsert(&self, entry: &CacheEntry) -> AppResult<()>;

    fn len(&self) -> AppResult<usize>;

    fn is_empty(&self) -> AppResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every entry. Returns how many were removed.
    fn clear(&self) -> AppResult<usize>;

    fn record_operation(&self, record: &OperationRecord) -> AppResult<()>;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cached_answers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fingerprint TEXT NOT NULL UNIQUE,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    context TEXT NOT NULL,
    sources TEXT NOT NULL,
    category TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS operation_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    operation TEXT NOT NULL,
    details TEXT NOT NULL,
    elapsed_secs REAL NOT NULL,
    recorded_at TEXT NOT NULL
);
"#;

/// SQLite-backed cache. One connection, serialized by a mutex.
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

impl SqliteCacheStore {
    /// Open (or create) the cache database at `path`.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Cache(format!("Failed to create cache directory: {}", e)))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Cache(format!("Failed to open cache {:?}: {}", path, e)))?;
        tracing::debug!("Opened answer cache at {:?}", path);
        Self::with_connection(conn)
    }

    /// Open a private in-memory cache.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Cache(format!("Failed to open in-memory cache: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Cache(format!("Failed to create cache tables: {}", e)))?;
        add_category_column(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Cache("Cache connection lock poisoned".to_string()))
    }

    /// Most recent operation log lines, newest first.
    pub fn recent_operations(&self, limit: usize) -> AppResult<Vec<OperationRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT operation, details, elapsed_secs, recorded_at FROM operation_log
                 ORDER BY id DESC LIMIT ?1",
            )
            .map_err(|e| AppError::Cache(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(OperationRecord {
                    operation: row.get(0)?,
                    details: row.get(1)?,
                    elapsed_secs: row.get(2)?,
                    recorded_at: parse_timestamp(&row.get::<_, String>(3)?),
                })
            })
            .map_err(|e| AppError::Cache(format!("Failed to query operations: {}", e)))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Cache(format!("Failed to read operation row: {}", e)))
    }
}

/// Caches created before the category column existed get it added in place.
fn add_category_column(conn: &Connection) -> AppResult<()> {
    let present: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('cached_answers') WHERE name = 'category'",
            [],
            |row| row.get(0),
        )
        .map_err(|e| AppError::Cache(format!("Failed to inspect cache schema: {}", e)))?;

    if present == 0 {
        conn.execute("ALTER TABLE cached_answers ADD COLUMN category TEXT", [])
            .map_err(|e| AppError::Cache(format!("Failed to migrate cache schema: {}", e)))?;
        tracing::info!("Added category column to answer cache");
    }
    Ok(())
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

impl CacheStore for SqliteCacheStore {
    fn get(&self, fingerprint: &str) -> AppResult<Option<CacheEntry>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT fingerprint, question, answer, context, sources, category, created_at
                 FROM cached_answers WHERE fingerprint = ?1",
                params![fingerprint],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| AppError::Cache(format!("Failed to read cache: {}", e)))?;

        let Some((fingerprint, question, answer, context, sources, category, created_at)) = row else {
            return Ok(None);
        };

        Ok(Some(CacheEntry {
            fingerprint,
            question,
            answer,
            context,
            sources: serde_json::from_str(&sources)?,
            category,
            created_at: parse_timestamp(&created_at),
        }))
    }

    fn upsert(&self, entry: &CacheEntry) -> AppResult<()> {
        let sources = serde_json::to_string(&entry.sources)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO cached_answers (fingerprint, question, answer, context, sources, category, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(fingerprint) DO UPDATE SET
                question = excluded.question,
                answer = excluded.answer,
                context = excluded.context,
                sources = excluded.sources,
                category = excluded.category,
                created_at = excluded.created_at",
            params![
                entry.fingerprint,
                entry.question,
                entry.answer,
                entry.context,
                sources,
                entry.category,
                entry.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| AppError::Cache(format!("Failed to write cache: {}", e)))?;
        Ok(())
    }

    fn len(&self) -> AppResult<usize> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM cached_answers", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as usize)
        .map_err(|e| AppError::Cache(format!("Failed to count cache entries: {}", e)))
    }

    fn clear(&self) -> AppResult<usize> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM cached_answers", [])
            .map_err(|e| AppError::Cache(format!("Failed to clear cache: {}", e)))
    }

    fn record_operation(&self, record: &OperationRecord) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO operation_log (operation, details, elapsed_secs, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.operation,
                record.details,
                record.elapsed_secs,
                record.recorded_at.to_rfc3339(),
            ],
        )
        .map_err(|e| AppError::Cache(format!("Failed to record operation: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(fingerprint: &str, answer: &str, sources: &[&str]) -> CacheEntry {
        CacheEntry {
            fingerprint: fingerprint.to_string(),
            question: "q".to_string(),
            answer: answer.to_string(),
            context: "ctx".to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            category: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_get_missing() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        assert!(store.get("absent").unwrap().is_none());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_upsert_replaces() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        store.upsert(&entry("k", "first", &[])).unwrap();
        store
            .upsert(&entry("k", "second", &["a.txt", "b.csv"]))
            .unwrap();

        assert_eq!(store.len().unwrap(), 1);
        let cached = store.get("k").unwrap().unwrap();
        assert_eq!(cached.answer, "second");
        assert_eq!(cached.sources, vec!["a.txt", "b.csv"]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state/cache.sqlite");

        {
            let store = SqliteCacheStore::open(&path).unwrap();
            store.upsert(&entry("k", "kept", &["Math API"])).unwrap();
        }

        let store = SqliteCacheStore::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap().unwrap().answer, "kept");
    }

    #[test]
    fn test_category_round_trips() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        let mut with_category = entry("k", "6 * 7 = 42", &["Math API"]);
        with_category.category = Some("arithmetic".to_string());
        store.upsert(&with_category).unwrap();

        assert_eq!(
            store.get("k").unwrap().unwrap().category.as_deref(),
            Some("arithmetic")
        );
    }

    #[test]
    fn test_old_cache_gains_category_column() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE cached_answers (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    fingerprint TEXT NOT NULL UNIQUE,
                    question TEXT NOT NULL,
                    answer TEXT NOT NULL,
                    context TEXT NOT NULL,
                    sources TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
                INSERT INTO cached_answers (fingerprint, question, answer, context, sources, created_at)
                VALUES ('old', 'q', 'kept', 'ctx', '[]', '2026-01-01T00:00:00+00:00');",
            )
            .unwrap();
        }

        let store = SqliteCacheStore::open(&path).unwrap();
        let old = store.get("old").unwrap().unwrap();
        assert_eq!(old.answer, "kept");
        assert!(old.category.is_none());

        let mut fresh = entry("new", "Factors of 9: [1, 3, 9]", &["Factorization API"]);
        fresh.category = Some("factorization".to_string());
        store.upsert(&fresh).unwrap();
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_clear() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        store.upsert(&entry("a", "1", &[])).unwrap();
        store.upsert(&entry("b", "2", &[])).unwrap();

        assert_eq!(store.clear().unwrap(), 2);
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn test_operation_log() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        store
            .record_operation(&OperationRecord::new("resolve", "first", 0.5))
            .unwrap();
        store
            .record_operation(&OperationRecord::new("cache_hit", "second", 0.01))
            .unwrap();

        let ops = store.recent_operations(10).unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].operation, "cache_hit");
        assert_eq!(ops[1].details, "first");
    }
}
