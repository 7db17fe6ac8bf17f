//! Ask a question from the command line

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::app::{build_agent, build_embedder, build_knowledge, build_store};
use crate::config::Config;
use crate::integrations::{Generator, MistralClient, OllamaClient, OllamaGenerator};

/// With `route`, the classifier picks chat or knowledge; otherwise the index is always used.
pub async fn run(config: &Config, index: &str, question: &str, route: bool) -> Result<()> {
    if question.trim().is_empty() {
        bail!("question must not be empty");
    }

    let ollama = OllamaClient::with_url(&config.ollama_url)?;
    let store = build_store(config)?;
    let embedder = build_embedder(config, &ollama);
    let generator: Arc<dyn Generator> =
        Arc::new(OllamaGenerator::new(ollama, &config.generate_model));

    if route {
        let mistral = MistralClient::with_url(&config.mistral_api_key, &config.mistral_url)?;
        let agent = build_agent(config, mistral, embedder, generator, store);
        let reply = agent.run(index, question).await?;
        println!("[{}] {}", reply.classification, reply.answer);
    } else {
        let knowledge = build_knowledge(config, embedder, generator, store);
        println!("{}", knowledge.answer(index, question).await?);
    }

    Ok(())
}
