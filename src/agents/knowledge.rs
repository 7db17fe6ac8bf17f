//! Retrieval-augmented answers over one persisted index.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::integrations::{Embedder, Generator};
use crate::prompts::{retriever_prompt, Prompt};
use crate::store::{ScoredChunk, VectorStore};
use crate::Result;

/// Settings the index was expected to be built with.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

pub struct KnowledgeAgent {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    top_k: usize,
    settings: ChunkSettings,
    template: String,
}

impl KnowledgeAgent {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn Generator>,
        top_k: usize,
        settings: ChunkSettings,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            top_k: top_k.max(1),
            settings,
            template: Prompt::Retriever.template(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Top-k chunks for a question, best first.
    pub async fn retrieve(&self, index_name: &str, question: &str) -> Result<Vec<ScoredChunk>> {
        let manifest = self.store.manifest(index_name).await?;
        let drift = manifest.drift(
            self.settings.chunk_size,
            self.settings.chunk_overlap,
            self.embedder.model(),
        );
        if !drift.is_empty() {
            warn!(
                index = %index_name,
                drift = %drift.join(", "),
                "Index was built with different settings; results may degrade"
            );
        }

        let query = self.embedder.embed(question).await?;
        let hits = self.store.search(index_name, &query, self.top_k).await?;
        debug!(index = %index_name, hits = hits.len(), "Retrieved chunks");
        Ok(hits)
    }

    /// Fill the answer prompt with retrieved text.
    pub fn compose(&self, hits: &[ScoredChunk], question: &str) -> String {
        let context = hits
            .iter()
            .map(|h| h.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        retriever_prompt(&self.template, &context, question)
    }

    /// Answer from the index. The generator output is returned verbatim.
    pub async fn answer(&self, index_name: &str, question: &str) -> Result<String> {
        let hits = self.retrieve(index_name, question).await?;
        let prompt = self.compose(&hits, question);
        let answer = self.generator.generate(&prompt).await?;
        info!(index = %index_name, chunks = hits.len(), "Knowledge answer generated");
        Ok(answer)
    }
}
