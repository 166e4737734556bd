//! Document index type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A document registered in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// File name, unique within the documents folder
    pub name: String,

    /// Path the document was read from
    pub path: PathBuf,

    /// Document kind: "text", "markdown", "csv"
    pub doc_type: String,

    /// Number of chunks stored for this document
    pub chunks: u32,

    /// When this document was indexed
    pub added_at: DateTime<Utc>,
}

/// A raw retrieval hit, before relevance scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedSnippet {
    /// Chunk text
    pub content: String,

    /// Name of the document the chunk came from
    pub source_id: String,

    /// Distance to the question, lower is closer. Never negative.
    pub distance: f32,
}

/// Internal chunk candidate before embedding.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub position: u32,
    pub text: String,
}
