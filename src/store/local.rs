//! Flat vector index persisted as JSON on the local filesystem.
//!
//! Layout: `<root>/<index_name>/index.json` plus an `index.lock` file used for
//! advisory locking. Writes go to a temp file and are renamed into place
//! while holding the exclusive lock.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::similarity::{cosine_similarity, l2_norm};
use super::{validate_index_name, IndexManifest, IndexedChunk, ScoredChunk, VectorStore};
use crate::config::INDEX_PREFIX;
use crate::{Error, Result};

const INDEX_FILE: &str = "index.json";
const LOCK_FILE: &str = "index.lock";

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    manifest: IndexManifest,
    entries: Vec<IndexedChunk>,
}

/// Vector store keeping one directory per index under `root`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the given index.
    pub fn index_path(&self, index_name: &str) -> PathBuf {
        self.root.join(index_name)
    }

    fn lock_file(dir: &Path) -> Result<File> {
        Ok(OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_FILE))?)
    }

    fn write_index(dir: PathBuf, file: IndexFile) -> Result<()> {
        fs::create_dir_all(&dir)?;
        let lock = Self::lock_file(&dir)?;
        lock.lock_exclusive()?;

        let path = dir.join(INDEX_FILE);
        let tmp = path.with_extension("json.tmp");
        let result = serde_json::to_vec(&file)
            .map_err(Error::from)
            .and_then(|bytes| fs::write(&tmp, bytes).map_err(Error::from))
            .and_then(|_| fs::rename(&tmp, &path).map_err(Error::from));

        let _ = FileExt::unlock(&lock);
        result
    }

    fn read_index(dir: PathBuf, index_name: &str) -> Result<IndexFile> {
        let path = dir.join(INDEX_FILE);
        if !path.exists() {
            return Err(Error::IndexNotFound(index_name.to_string()));
        }

        let lock = Self::lock_file(&dir)?;
        lock.lock_shared()?;
        let bytes = fs::read(&path);
        let _ = FileExt::unlock(&lock);

        Ok(serde_json::from_slice(&bytes?)?)
    }

    async fn load(&self, index_name: &str) -> Result<IndexFile> {
        validate_index_name(index_name)?;
        let dir = self.index_path(index_name);
        let name = index_name.to_string();
        tokio::task::spawn_blocking(move || Self::read_index(dir, &name))
            .await
            .map_err(|e| Error::VectorStoreError(format!("index read task failed: {}", e)))?
    }
}

#[async_trait]
impl VectorStore for LocalStore {
    async fn replace(&self, manifest: &IndexManifest, entries: Vec<IndexedChunk>) -> Result<()> {
        validate_index_name(&manifest.index_name)?;
        let dir = self.index_path(&manifest.index_name);
        let count = entries.len();
        let file = IndexFile {
            manifest: manifest.clone(),
            entries,
        };

        tokio::task::spawn_blocking(move || Self::write_index(dir, file))
            .await
            .map_err(|e| Error::VectorStoreError(format!("index write task failed: {}", e)))??;

        info!(index = %manifest.index_name, chunks = count, "Index written");
        Ok(())
    }

    async fn search(
        &self,
        index_name: &str,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let file = self.load(index_name).await?;
        if file.manifest.dimension != 0 && file.manifest.dimension != query.len() {
            return Err(Error::VectorStoreError(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                file.manifest.dimension
            )));
        }

        let query_norm = l2_norm(query);
        let mut scored: Vec<ScoredChunk> = file
            .entries
            .into_iter()
            .map(|entry| {
                let score =
                    cosine_similarity(query, &entry.embedding, query_norm, l2_norm(&entry.embedding));
                ScoredChunk {
                    chunk: entry.chunk,
                    score,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);

        debug!(index = %index_name, hits = scored.len(), "Local search finished");
        Ok(scored)
    }

    async fn manifest(&self, index_name: &str) -> Result<IndexManifest> {
        Ok(self.load(index_name).await?.manifest)
    }

    async fn list(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir())
            .filter(|entry| entry.path().join(INDEX_FILE).exists())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| name.starts_with(INDEX_PREFIX))
            .collect();

        names.sort();
        Ok(names)
    }
}
