//! Document retrieval for strictqa.
//!
//! Scans a documents folder, chunks and embeds each file, and answers
//! nearest-chunk queries from a local SQLite index.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod parser;
pub mod retriever;
pub mod types;

pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::SqliteIndex;
pub use retriever::{DocumentRetriever, KnowledgeBase};
pub use types::{DocumentRecord, RetrievedSnippet};
