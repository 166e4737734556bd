//! SQLite-backed vector index for document chunks.

use crate::types::{DocumentRecord, RetrievedSnippet};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use strictqa_core::{AppError, AppResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    name TEXT PRIMARY KEY,
    path TEXT NOT NULL,
    doc_type TEXT NOT NULL,
    chunks INTEGER NOT NULL,
    added_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document TEXT NOT NULL,
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    embedding BLOB NOT NULL,
    FOREIGN KEY (document) REFERENCES documents(name)
);

CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document);
"#;

/// Chunk text with its embedding, ready to store.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub position: u32,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Document and chunk store. The connection sits behind a mutex so the index
/// can be shared across tasks.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
}

impl SqliteIndex {
    /// Open (or create) the index at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
        tracing::debug!("Opened SQLite index at {:?}", db_path);
        Self::with_connection(conn)
    }

    /// Open a private in-memory index.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Knowledge("Index connection lock poisoned".to_string()))
    }

    /// Whether a document with this name is already registered.
    pub fn contains(&self, name: &str) -> AppResult<bool> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT 1 FROM documents WHERE name = ?1",
            params![name],
            |_| Ok(()),
        )
        .optional()
        .map(|row| row.is_some())
        .map_err(|e| AppError::Knowledge(format!("Failed to look up document: {}", e)))
    }

    /// Register a document and its chunks in one transaction.
    pub fn insert_document(&self, record: &DocumentRecord, chunks: &[EmbeddedChunk]) -> AppResult<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;

        tx.execute(
            "INSERT OR REPLACE INTO documents (name, path, doc_type, chunks, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.name,
                record.path.to_string_lossy(),
                record.doc_type,
                record.chunks as i64,
                record.added_at.to_rfc3339(),
            ],
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to insert document: {}", e)))?;

        tx.execute("DELETE FROM chunks WHERE document = ?1", params![record.name])
            .map_err(|e| AppError::Knowledge(format!("Failed to replace chunks: {}", e)))?;

        for chunk in chunks {
            tx.execute(
                "INSERT INTO chunks (document, position, text, embedding) VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.name,
                    chunk.position as i64,
                    chunk.text,
                    embedding_to_bytes(&chunk.embedding),
                ],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit document: {}", e)))?;
        Ok(())
    }

    /// All registered documents, ordered by name.
    pub fn documents(&self) -> AppResult<Vec<DocumentRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT name, path, doc_type, chunks, added_at FROM documents ORDER BY name")
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let added_at: String = row.get(4)?;
                Ok(DocumentRecord {
                    name: row.get(0)?,
                    path: PathBuf::from(row.get::<_, String>(1)?),
                    doc_type: row.get(2)?,
                    chunks: row.get::<_, i64>(3)? as u32,
                    added_at: DateTime::parse_from_rfc3339(&added_at)
                        .map(|t| t.with_timezone(&Utc))
                        .unwrap_or_default(),
                })
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to query documents: {}", e)))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Knowledge(format!("Failed to read document row: {}", e)))
    }

    /// Number of registered documents.
    pub fn document_count(&self) -> AppResult<usize> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .map_err(|e| AppError::Knowledge(format!("Failed to count documents: {}", e)))
    }

    /// Top-k chunks closest to `query_embedding`, nearest first.
    ///
    /// Distance is cosine distance scaled to per-mille: `(1 - cos) * 1000`,
    /// clamped to `[0, 2000]`.
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<RetrievedSnippet>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT document, text, embedding FROM chunks")
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            let (source_id, content, bytes) =
                row.map_err(|e| AppError::Knowledge(format!("Failed to read chunk row: {}", e)))?;
            let embedding = bytes_to_embedding(&bytes)?;
            let distance = ((1.0 - cosine_similarity(query_embedding, &embedding)) * 1000.0)
                .clamp(0.0, 2000.0);
            results.push(RetrievedSnippet {
                content,
                source_id,
                distance,
            });
        }

        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            results.len(),
            top_k
        );

        Ok(results)
    }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Cosine similarity; 0 for mismatched lengths or zero vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
