//! Document retriever: the seam the routing controller searches through.

use crate::chunker::chunk_text;
use crate::embeddings::EmbeddingProvider;
use crate::index::{EmbeddedChunk, SqliteIndex};
use crate::parser::{parse_file, ContentType};
use crate::types::{DocumentRecord, RetrievedSnippet};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strictqa_core::AppResult;
use walkdir::WalkDir;

/// Source of document snippets for a question.
#[async_trait::async_trait]
pub trait DocumentRetriever: Send + Sync {
    /// Up to `k` snippets, nearest first.
    async fn search(&self, question: &str, k: usize) -> AppResult<Vec<RetrievedSnippet>>;

    /// Number of indexed documents.
    fn document_count(&self) -> AppResult<usize>;

    /// Registered documents.
    fn documents(&self) -> AppResult<Vec<DocumentRecord>>;

    /// Index documents that appeared since the last scan. Returns how many
    /// were added.
    async fn scan(&self) -> AppResult<usize>;
}

/// Folder-backed retriever over a SQLite index.
pub struct KnowledgeBase {
    documents_dir: PathBuf,
    index: SqliteIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl KnowledgeBase {
    pub fn new(
        documents_dir: impl Into<PathBuf>,
        index: SqliteIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            documents_dir: documents_dir.into(),
            index,
            embedder,
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn documents_dir(&self) -> &Path {
        &self.documents_dir
    }

    /// Parse, chunk, embed and register one file.
    async fn add_document(&self, path: &Path, name: &str, kind: ContentType) -> AppResult<u32> {
        let text = parse_file(path)?;
        let candidates = chunk_text(&text, self.chunk_size, self.chunk_overlap);
        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let chunks: Vec<EmbeddedChunk> = candidates
            .into_iter()
            .zip(embeddings)
            .map(|(candidate, embedding)| EmbeddedChunk {
                position: candidate.position,
                text: candidate.text,
                embedding,
            })
            .collect();

        let record = DocumentRecord {
            name: name.to_string(),
            path: path.to_path_buf(),
            doc_type: kind.as_str().to_string(),
            chunks: chunks.len() as u32,
            added_at: Utc::now(),
        };
        self.index.insert_document(&record, &chunks)?;

        Ok(record.chunks)
    }
}

#[async_trait::async_trait]
impl DocumentRetriever for KnowledgeBase {
    async fn search(&self, question: &str, k: usize) -> AppResult<Vec<RetrievedSnippet>> {
        let query = self.embedder.embed(question).await?;
        self.index.search(&query, k)
    }

    fn document_count(&self) -> AppResult<usize> {
        self.index.document_count()
    }

    fn documents(&self) -> AppResult<Vec<DocumentRecord>> {
        self.index.documents()
    }

    async fn scan(&self) -> AppResult<usize> {
        if !self.documents_dir.is_dir() {
            tracing::warn!("Documents folder {:?} does not exist", self.documents_dir);
            return Ok(0);
        }

        let mut added = 0;

        for entry in WalkDir::new(&self.documents_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let Some(kind) = ContentType::from_path(path) else {
                continue;
            };
            let name = entry.file_name().to_string_lossy().to_string();
            if self.index.contains(&name)? {
                continue;
            }

            match self.add_document(path, &name, kind).await {
                Ok(chunks) => {
                    tracing::info!("Indexed document {} ({} chunks)", name, chunks);
                    added += 1;
                }
                Err(e) => tracing::error!("Failed to index {:?}: {}", path, e),
            }
        }

        tracing::info!("Scan of {:?} added {} documents", self.documents_dir, added);
        Ok(added)
    }
}
