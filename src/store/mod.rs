//! Persisted vector indexes.
//!
//! One index per uploaded document, named `faiss_index_<stem>`. Indexes are
//! written whole and replaced on re-ingestion; they are never patched.

pub mod local;
pub mod qdrant;
pub mod similarity;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::INDEX_PREFIX;
use crate::ingest::Chunk;
use crate::{Error, Result};

pub use local::LocalStore;
pub use qdrant::QdrantStore;

/// A chunk with its embedding, as written to an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A retrieved chunk and its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Parameters an index was built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub index_name: String,
    pub source: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embed_model: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

impl IndexManifest {
    /// Human-readable differences against the settings a query runs with.
    pub fn drift(&self, chunk_size: usize, chunk_overlap: usize, embed_model: &str) -> Vec<String> {
        let mut out = Vec::new();
        if self.chunk_size != chunk_size {
            out.push(format!("chunk_size {} != {}", self.chunk_size, chunk_size));
        }
        if self.chunk_overlap != chunk_overlap {
            out.push(format!("chunk_overlap {} != {}", self.chunk_overlap, chunk_overlap));
        }
        if self.embed_model != embed_model {
            out.push(format!("embed_model {} != {}", self.embed_model, embed_model));
        }
        out
    }
}

/// Storage for named vector indexes.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the index named in `manifest`, replacing any existing one.
    async fn replace(&self, manifest: &IndexManifest, entries: Vec<IndexedChunk>) -> Result<()>;

    /// Top `top_k` chunks by similarity, best first.
    async fn search(&self, index_name: &str, query: &[f32], top_k: usize)
        -> Result<Vec<ScoredChunk>>;

    /// Manifest of an existing index.
    async fn manifest(&self, index_name: &str) -> Result<IndexManifest>;

    /// Names of all indexes, sorted.
    async fn list(&self) -> Result<Vec<String>>;
}

/// Reject names that are not `faiss_index_*` or that could escape the index root.
///
/// The prefix already rules out `.` and `..`, so only separators need checking.
pub fn validate_index_name(name: &str) -> Result<()> {
    let valid = name.starts_with(INDEX_PREFIX)
        && name.len() > INDEX_PREFIX.len()
        && !name.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("invalid index name: {:?}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> IndexManifest {
        IndexManifest {
            index_name: "faiss_index_doc".into(),
            source: "doc.pdf".into(),
            chunk_size: 300,
            chunk_overlap: 20,
            embed_model: "mxbai-embed-large:latest".into(),
            dimension: 3,
            chunk_count: 2,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn drift_is_empty_for_matching_settings() {
        assert!(manifest().drift(300, 20, "mxbai-embed-large:latest").is_empty());
    }

    #[test]
    fn drift_lists_each_difference() {
        let drift = manifest().drift(500, 20, "nomic-embed-text");
        assert_eq!(drift.len(), 2);
        assert!(drift[0].contains("chunk_size 300 != 500"));
        assert!(drift[1].contains("nomic-embed-text"));
    }

    #[test]
    fn index_names_are_validated() {
        assert!(validate_index_name("faiss_index_doc").is_ok());
        assert!(validate_index_name("faiss_index_report.v2").is_ok());
        assert!(validate_index_name("faiss_index_").is_err());
        assert!(validate_index_name("doc").is_err());
        assert!(validate_index_name("faiss_index_../etc").is_err());
        assert!(validate_index_name("faiss_index_a/b").is_err());
        assert!(validate_index_name("faiss_index_..").is_ok());
        assert!(validate_index_name("faiss_index_release..notes").is_ok());
    }
}
