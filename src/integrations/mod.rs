//! External model services.
//!
//! Provides clients for:
//! - Ollama (embeddings, generation)
//! - Mistral chat-completions API (classifier, small talk)
//!
//! The agents only see the traits below, so tests can swap in fakes.

pub mod mistral;
pub mod ollama;

use async_trait::async_trait;

pub use mistral::{ChatMessage, MistralChat, MistralClient};
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaGenerator};

use crate::Result;

/// Turns text into an embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model name recorded in index manifests.
    fn model(&self) -> &str;
}

/// Single-prompt text generation.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Multi-message chat completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String>;
}
