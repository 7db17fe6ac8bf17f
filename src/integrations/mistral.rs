//! Mistral chat-completions client used by the classifier and chat agents.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::ChatModel;
use crate::{Error, Result};

/// Mistral API client.
#[derive(Debug, Clone)]
pub struct MistralClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl MistralClient {
    /// Create client with API key and custom base URL (e.g. `https://api.mistral.ai/v1`).
    pub fn with_url<S: Into<String>>(api_key: S, base_url: &str) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::ConfigError("MISTRAL_API_KEY is empty".to_string()));
        }

        let http = Client::builder()
            .user_agent(concat!("rag_helpdesk/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::ChatApiError(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Chat completion.
    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: f32,
    ) -> Result<String> {
        let request = ChatRequest {
            model,
            messages,
            temperature,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ChatApiError(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::ChatApiError(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::ChatApiError(format!("{} {}", status.as_u16(), text)));
        }

        let chat_response: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| Error::ChatApiError(format!("invalid response: {}", e)))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| Error::ChatApiError("empty response".to_string()))
    }
}

/// [`MistralClient`] bound to one model and temperature.
#[derive(Debug, Clone)]
pub struct MistralChat {
    client: MistralClient,
    model: String,
    temperature: f32,
}

impl MistralChat {
    pub fn new(client: MistralClient, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }
}

#[async_trait]
impl ChatModel for MistralChat {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        self.client
            .chat_completion(messages, &self.model, self.temperature)
            .await
    }
}

/// Chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}
