//! Vector store integration with Qdrant
//!
//! One collection per index. Qdrant has nowhere to keep our manifest, so it
//! lives next to the other local artifacts as `<index_name>.manifest.json`.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info};
use uuid::Uuid;

use super::{validate_index_name, IndexManifest, IndexedChunk, ScoredChunk, VectorStore};
use crate::config::INDEX_PREFIX;
use crate::ingest::Chunk;
use crate::{Error, Result};

/// Points per upsert request.
const UPSERT_BATCH: usize = 256;

/// Vector store backed by Qdrant
pub struct QdrantStore {
    client: Qdrant,
    manifest_dir: PathBuf,
}

impl QdrantStore {
    /// Connect to Qdrant server
    pub fn new(url: &str, manifest_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Qdrant::from_url(url).build()?;
        Ok(Self {
            client,
            manifest_dir: manifest_dir.into(),
        })
    }

    fn manifest_path(&self, index_name: &str) -> PathBuf {
        self.manifest_dir
            .join(format!("{}.manifest.json", index_name))
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn replace(&self, manifest: &IndexManifest, entries: Vec<IndexedChunk>) -> Result<()> {
        let name = manifest.index_name.as_str();
        validate_index_name(name)?;

        if self.client.collection_exists(name).await? {
            info!("Dropping existing collection '{}'", name);
            self.client.delete_collection(name).await?;
        }

        self.client
            .create_collection(CreateCollectionBuilder::new(name).vectors_config(
                VectorParamsBuilder::new(manifest.dimension as u64, Distance::Cosine),
            ))
            .await?;

        let points: Vec<PointStruct> = entries.into_iter().map(to_point).collect();
        let count = points.len();
        let mut batch = Vec::with_capacity(UPSERT_BATCH);
        for point in points {
            batch.push(point);
            if batch.len() == UPSERT_BATCH {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(UPSERT_BATCH));
                self.client
                    .upsert_points(UpsertPointsBuilder::new(name, full).wait(true))
                    .await?;
            }
        }
        if !batch.is_empty() {
            self.client
                .upsert_points(UpsertPointsBuilder::new(name, batch).wait(true))
                .await?;
        }

        tokio::fs::create_dir_all(&self.manifest_dir).await?;
        tokio::fs::write(self.manifest_path(name), serde_json::to_vec_pretty(manifest)?).await?;

        info!("Upserted {} chunks into '{}'", count, name);
        Ok(())
    }

    async fn search(
        &self,
        index_name: &str,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        validate_index_name(index_name)?;
        if !self.client.collection_exists(index_name).await? {
            return Err(Error::IndexNotFound(index_name.to_string()));
        }

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(index_name, query.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await?;

        let hits: Vec<ScoredChunk> = results
            .result
            .into_iter()
            .filter_map(|point| {
                let chunk = chunk_from_payload(&point.payload)?;
                Some(ScoredChunk {
                    chunk,
                    score: point.score,
                })
            })
            .collect();

        debug!("Qdrant returned {} hits from '{}'", hits.len(), index_name);
        Ok(hits)
    }

    async fn manifest(&self, index_name: &str) -> Result<IndexManifest> {
        validate_index_name(index_name)?;
        let path = self.manifest_path(index_name);
        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::IndexNotFound(index_name.to_string()),
            _ => Error::IoError(e),
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn list(&self) -> Result<Vec<String>> {
        let collections = self.client.list_collections().await?;
        let mut names: Vec<String> = collections
            .collections
            .into_iter()
            .map(|c| c.name)
            .filter(|name| name.starts_with(INDEX_PREFIX))
            .collect();
        names.sort();
        Ok(names)
    }
}

fn to_point(entry: IndexedChunk) -> PointStruct {
    let chunk = entry.chunk;
    let mut payload: HashMap<String, QdrantValue> = HashMap::new();
    payload.insert("chunk_id".into(), chunk.id.to_string().into());
    payload.insert("text".into(), chunk.text.into());
    payload.insert("source".into(), chunk.source.into());
    payload.insert("start".into(), (chunk.start as i64).into());
    payload.insert("end".into(), (chunk.end as i64).into());
    if let Some(page) = chunk.page {
        payload.insert("page".into(), (page as i64).into());
    }

    PointStruct::new(chunk.id.to_string(), entry.embedding, payload)
}

fn chunk_from_payload(payload: &HashMap<String, QdrantValue>) -> Option<Chunk> {
    let mut chunk = Chunk::new(
        payload.get("text")?.string_value()?.to_string(),
        payload.get("source")?.string_value()?,
        payload
            .get("page")
            .and_then(|v| v.integer_value())
            .map(|p| p as u32),
        payload.get("start")?.integer_value()? as usize,
        payload.get("end")?.integer_value()? as usize,
    );
    if let Some(id) = payload
        .get("chunk_id")
        .and_then(|v| v.string_value())
        .and_then(|s| Uuid::parse_str(s).ok())
    {
        chunk.id = id;
    }
    Some(chunk)
}

trait QdrantValueExt {
    fn integer_value(&self) -> Option<i64>;
    fn string_value(&self) -> Option<&str>;
}

impl QdrantValueExt for QdrantValue {
    fn integer_value(&self) -> Option<i64> {
        match &self.kind {
            Some(qdrant_client::qdrant::value::Kind::IntegerValue(v)) => Some(*v),
            _ => None,
        }
    }

    fn string_value(&self) -> Option<&str> {
        match &self.kind {
            Some(qdrant_client::qdrant::value::Kind::StringValue(v)) => Some(v),
            _ => None,
        }
    }
}
