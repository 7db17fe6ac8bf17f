//! Ollama client for local embeddings and generation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Embedder, Generator};
use crate::{Error, Result};

/// Longest text sent to the embeddings endpoint, in bytes.
const MAX_EMBED_INPUT: usize = 12_000;

/// Ollama client for local LLM.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
}

impl OllamaClient {
    /// Create client with custom URL.
    pub fn with_url(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::OllamaError(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if Ollama server is running.
    pub async fn is_running(&self) -> bool {
        self.http
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Generate text from a single prompt.
    pub async fn generate(&self, prompt: &str, model: &str) -> Result<String> {
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::OllamaError(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::OllamaError(format!("{} {}", status.as_u16(), text)));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::OllamaError(format!("invalid response: {}", e)))?;

        Ok(result.response)
    }

    /// Embed a single text.
    pub async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let prompt = truncate_utf8(text, MAX_EMBED_INPUT);
        if prompt.len() < text.len() {
            warn!(
                original_bytes = text.len(),
                sent_bytes = prompt.len(),
                "Embedding input truncated"
            );
        }
        let request = EmbeddingsRequest { model, prompt };

        let response = self
            .http
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::OllamaError(format!("embeddings request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::OllamaError(format!("{} {}", status.as_u16(), text)));
        }

        let result: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| Error::OllamaError(format!("invalid embeddings response: {}", e)))?;

        if result.embedding.is_empty() {
            return Err(Error::OllamaError("embeddings response was empty".to_string()));
        }
        Ok(result.embedding)
    }
}

/// [`OllamaClient`] bound to one embedding model.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(text, &self.model).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// [`OllamaClient`] bound to one generation model.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: OllamaClient,
    model: String,
}

impl OllamaGenerator {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.client.generate(prompt, &self.model).await
    }
}

fn truncate_utf8(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}
