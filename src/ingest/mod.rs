//! Ingestion pipeline: file → documents → chunks → embeddings → index.

pub mod chunker;
pub mod loader;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{info, warn};

pub use chunker::{Chunk, TextSplitter};
pub use loader::{load_document, Document};

use crate::config::Config;
use crate::integrations::Embedder;
use crate::store::{validate_index_name, IndexManifest, IndexedChunk, VectorStore};
use crate::{Error, Result};

/// Embedding requests in flight at once during ingestion.
const EMBED_CONCURRENCY: usize = 4;

/// Outcome of a single ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub index_name: String,
    pub documents: usize,
    pub chunks: usize,
}

/// Builds one index per file.
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    splitter: TextSplitter,
    upload_dir: PathBuf,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        splitter: TextSplitter,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            embedder,
            store,
            splitter,
            upload_dir: upload_dir.into(),
        }
    }

    /// Write uploaded bytes under the upload directory and return the path.
    ///
    /// Only the final component of the client-supplied name is used.
    pub async fn save_upload(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = sanitize_file_name(file_name)?;
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let path = self.upload_dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        info!(path = %path.display(), bytes = bytes.len(), "Saved upload");
        Ok(path)
    }

    /// Save an upload and index it.
    pub async fn ingest_upload(&self, file_name: &str, bytes: &[u8]) -> Result<IngestReport> {
        validate_index_name(&Config::index_name_for(&sanitize_file_name(file_name)?))?;
        let path = self.save_upload(file_name, bytes).await?;
        self.ingest_file(&path).await
    }

    /// Load, split, embed and index a file, replacing any index with the same name.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidArgument(format!("not a file path: {}", path.display()))
            })?
            .to_string();
        let index_name = Config::index_name_for(&file_name);
        validate_index_name(&index_name)?;

        let owned = path.to_path_buf();
        let documents = tokio::task::spawn_blocking(move || load_document(&owned))
            .await
            .map_err(|e| Error::UnsupportedDocument(format!("loader task failed: {}", e)))??;

        let chunks = self.splitter.split_documents(&documents);
        if chunks.is_empty() {
            return Err(Error::UnsupportedDocument(format!(
                "{} produced no chunks",
                file_name
            )));
        }

        info!(
            index = %index_name,
            documents = documents.len(),
            chunks = chunks.len(),
            "Embedding chunks"
        );

        let entries = self.embed_chunks(chunks).await?;
        let dimension = entries.first().map(|e| e.embedding.len()).unwrap_or(0);
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimension) {
            warn!(chunk = %bad.chunk.id, "Embedding dimension changed mid-ingestion");
            return Err(Error::OllamaError(format!(
                "inconsistent embedding dimensions: {} and {}",
                dimension,
                bad.embedding.len()
            )));
        }

        let manifest = IndexManifest {
            index_name: index_name.clone(),
            source: file_name,
            chunk_size: self.splitter.size(),
            chunk_overlap: self.splitter.overlap(),
            embed_model: self.embedder.model().to_string(),
            dimension,
            chunk_count: entries.len(),
            created_at: Utc::now(),
        };

        let report = IngestReport {
            index_name,
            documents: documents.len(),
            chunks: entries.len(),
        };
        self.store.replace(&manifest, entries).await?;

        info!(index = %report.index_name, chunks = report.chunks, "Index created");
        Ok(report)
    }

    async fn embed_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<IndexedChunk>> {
        let embedder = &self.embedder;
        stream::iter(chunks)
            .map(|chunk| async move {
                let embedding = embedder.embed(&chunk.text).await?;
                Ok::<_, Error>(IndexedChunk { chunk, embedding })
            })
            .buffered(EMBED_CONCURRENCY)
            .try_collect()
            .await
    }
}

/// Strip any directory part from a client-supplied file name.
pub fn sanitize_file_name(file_name: &str) -> Result<String> {
    let last = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if last.is_empty() || last == "." || last == ".." {
        return Err(Error::InvalidArgument(format!(
            "invalid upload file name: {:?}",
            file_name
        )));
    }
    Ok(last.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32, 1.0])
        }

        fn model(&self) -> &str {
            "counting"
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(Error::OllamaError("503 unavailable".into()))
        }

        fn model(&self) -> &str {
            "failing"
        }
    }

    fn ingestor(dir: &Path, embedder: Arc<dyn Embedder>) -> (Ingestor, Arc<LocalStore>) {
        let store = Arc::new(LocalStore::new(dir.join("indexes")));
        let ingestor = Ingestor::new(
            embedder,
            store.clone(),
            TextSplitter::new(40, 5),
            dir.join("uploads"),
        );
        (ingestor, store)
    }

    #[test]
    fn file_names_lose_directories() {
        assert_eq!(sanitize_file_name("doc.pdf").unwrap(), "doc.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\notes.txt").unwrap(), "notes.txt");
        assert!(sanitize_file_name("uploads/").is_err());
        assert!(sanitize_file_name("..").is_err());
        assert!(sanitize_file_name("").is_err());
    }

    #[tokio::test]
    async fn upload_builds_named_index_with_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let (ingestor, store) = ingestor(dir.path(), embedder.clone());

        let text = "Printers on floor two need the new driver.\n\nOutlook profiles can be reset from the portal.";
        let report = ingestor.ingest_upload("notes.txt", text.as_bytes()).await.unwrap();

        assert_eq!(report.index_name, "faiss_index_notes");
        assert_eq!(report.documents, 1);
        assert!(report.chunks >= 2);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), report.chunks);
        assert!(dir.path().join("uploads").join("notes.txt").exists());

        let manifest = store.manifest("faiss_index_notes").await.unwrap();
        assert_eq!(manifest.chunk_size, 40);
        assert_eq!(manifest.chunk_overlap, 5);
        assert_eq!(manifest.embed_model, "counting");
        assert_eq!(manifest.dimension, 2);
        assert_eq!(manifest.chunk_count, report.chunks);
        assert_eq!(manifest.source, "notes.txt");
    }

    #[tokio::test]
    async fn embeddings_keep_chunk_order() {
        let dir = tempfile::tempdir().unwrap();
        let (ingestor, _) = ingestor(
            dir.path(),
            Arc::new(CountingEmbedder {
                calls: AtomicUsize::new(0),
            }),
        );
        let chunks = vec![
            Chunk::new("a".into(), "x", None, 0, 1),
            Chunk::new("bbb".into(), "x", None, 1, 4),
            Chunk::new("cc".into(), "x", None, 4, 6),
        ];

        let entries = ingestor.embed_chunks(chunks).await.unwrap();
        let lens: Vec<f32> = entries.iter().map(|e| e.embedding[0]).collect();
        assert_eq!(lens, vec![1.0, 3.0, 2.0]);
    }

    #[tokio::test]
    async fn embedding_failure_leaves_no_index() {
        let dir = tempfile::tempdir().unwrap();
        let (ingestor, store) = ingestor(dir.path(), Arc::new(FailingEmbedder));

        let err = ingestor
            .ingest_upload("faq.txt", b"How do I reset my password?")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::OllamaError(_)));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dotted_stems_are_valid_index_names() {
        let dir = tempfile::tempdir().unwrap();
        let (ingestor, store) = ingestor(
            dir.path(),
            Arc::new(CountingEmbedder {
                calls: AtomicUsize::new(0),
            }),
        );

        let report = ingestor
            .ingest_upload("release..notes.txt", b"VPN client 5.2 fixes the login loop.")
            .await
            .unwrap();

        assert_eq!(report.index_name, "faiss_index_release..notes");
        assert_eq!(store.list().await.unwrap(), vec!["faiss_index_release..notes"]);
        let hits = store.search("faiss_index_release..notes", &[10.0, 1.0], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unindexable_name_is_rejected_before_embedding() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let (ingestor, _) = ingestor(dir.path(), embedder.clone());

        let path = dir.path().join("kb\\vpn.txt");
        std::fs::write(&path, "Reinstall the VPN client.").unwrap();
        let err = ingestor.ingest_file(&path).await.unwrap_err();

        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (ingestor, _) = ingestor(
            dir.path(),
            Arc::new(CountingEmbedder {
                calls: AtomicUsize::new(0),
            }),
        );

        let err = ingestor.ingest_upload("blank.txt", b"   \n").await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedDocument(_)));
    }
}
