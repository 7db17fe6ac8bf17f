//! Wiring of clients, stores and agents from [`Config`].

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::agents::{Agent, ChatAgent, ChunkSettings, Classifier, KnowledgeAgent};
use crate::auth::{MySqlUserDirectory, StaticUserDirectory, UserDirectory};
use crate::config::{Config, StoreBackend};
use crate::ingest::{Ingestor, TextSplitter};
use crate::integrations::{
    ChatModel, Embedder, Generator, MistralChat, MistralClient, OllamaClient, OllamaEmbedder,
    OllamaGenerator,
};
use crate::store::{LocalStore, QdrantStore, VectorStore};
use crate::Result;

const CLASSIFIER_TEMPERATURE: f32 = 0.0;
const CHAT_TEMPERATURE: f32 = 0.7;

/// Everything the web layer needs, shared across requests.
pub struct Services {
    pub ingestor: Ingestor,
    pub agent: Agent,
    pub store: Arc<dyn VectorStore>,
    pub users: Arc<dyn UserDirectory>,
    /// Probed by `/health`; absent when model services are faked
    pub ollama: Option<OllamaClient>,
}

impl Services {
    pub fn from_config(config: &Config) -> Result<Self> {
        let ollama = OllamaClient::with_url(&config.ollama_url)?;
        let store = build_store(config)?;
        let embedder = build_embedder(config, &ollama);
        let generator: Arc<dyn Generator> =
            Arc::new(OllamaGenerator::new(ollama.clone(), &config.generate_model));
        let mistral = MistralClient::with_url(&config.mistral_api_key, &config.mistral_url)?;
        info!(ollama = %ollama.base_url(), mistral = %config.mistral_url, "Model services configured");

        Ok(Self {
            ingestor: build_ingestor(config, embedder.clone(), store.clone()),
            agent: build_agent(config, mistral, embedder, generator, store.clone()),
            store,
            users: build_users(config)?,
            ollama: Some(ollama),
        })
    }
}

pub fn build_store(config: &Config) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match config.backend {
        StoreBackend::Local => Arc::new(LocalStore::new(&config.index_dir)),
        StoreBackend::Qdrant => Arc::new(QdrantStore::new(&config.qdrant_url, &config.index_dir)?),
    };
    info!(backend = ?config.backend, "Vector store ready");
    Ok(store)
}

pub fn build_embedder(config: &Config, ollama: &OllamaClient) -> Arc<dyn Embedder> {
    Arc::new(OllamaEmbedder::new(ollama.clone(), &config.embed_model))
}

pub fn build_ingestor(
    config: &Config,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
) -> Ingestor {
    Ingestor::new(
        embedder,
        store,
        TextSplitter::new(config.chunk_size, config.chunk_overlap),
        &config.upload_dir,
    )
}

pub fn build_knowledge(
    config: &Config,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    store: Arc<dyn VectorStore>,
) -> KnowledgeAgent {
    KnowledgeAgent::new(
        embedder,
        store,
        generator,
        config.top_k,
        ChunkSettings {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        },
    )
}

pub fn build_classifier(config: &Config, mistral: MistralClient) -> Classifier {
    let model: Arc<dyn ChatModel> = Arc::new(MistralChat::new(
        mistral,
        &config.classifier_model,
        CLASSIFIER_TEMPERATURE,
    ));
    Classifier::new(model)
}

pub fn build_agent(
    config: &Config,
    mistral: MistralClient,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    store: Arc<dyn VectorStore>,
) -> Agent {
    let chat_model: Arc<dyn ChatModel> = Arc::new(MistralChat::new(
        mistral.clone(),
        &config.chat_model,
        CHAT_TEMPERATURE,
    ));

    Agent::new(
        build_classifier(config, mistral),
        ChatAgent::new(chat_model, Duration::from_millis(config.chat_delay_ms)),
        build_knowledge(config, embedder, generator, store),
    )
}

/// Users from the YAML file when configured, MySQL otherwise.
pub fn build_users(config: &Config) -> Result<Arc<dyn UserDirectory>> {
    match &config.users_file {
        Some(path) => {
            let users = StaticUserDirectory::from_yaml_file(path)?;
            info!(path = %path.display(), users = users.len(), "Using static user list");
            Ok(Arc::new(users))
        }
        None => Ok(Arc::new(MySqlUserDirectory::new(&config.mysql))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_LOCK;
    use crate::Error;

    #[test]
    fn missing_api_key_fails_startup() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut config = Config::defaults();
        config.mistral_api_key = String::new();

        let err = Services::from_config(&config).err().unwrap();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[tokio::test]
    async fn local_backend_lists_from_index_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = {
            let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            Config::defaults()
        };
        config.index_dir = dir.path().to_path_buf();
        config.backend = StoreBackend::Local;

        let store = build_store(&config).unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[test]
    fn users_file_takes_precedence_over_mysql() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.yml");
        std::fs::write(&path, "users: []\n").unwrap();
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut config = Config::defaults();
        config.users_file = Some(path);

        assert!(build_users(&config).is_ok());
    }
}
