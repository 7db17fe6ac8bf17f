//! Retrieval-augmented helpdesk chatbot.
//!
//! This library provides:
//! - Document ingestion: load → chunk → embed → persisted index
//! - A classifier agent routing questions to small talk or retrieval
//! - Retrieval-augmented answers over Ollama models
//! - The web application (upload, query, agent, login pages)
//! - Prometheus metrics

pub mod agents;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod ingest;
pub mod integrations;
pub mod metrics;
pub mod prompts;
pub mod store;
pub mod web;

// Re-export common types
pub use agents::{Agent, AgentReply, Classification};
pub use app::Services;
pub use config::Config;
pub use error::{Error, Result};
pub use integrations::{MistralClient, OllamaClient};
pub use prompts::{load_prompt, Prompt};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
