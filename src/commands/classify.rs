//! Print the route the classifier picks for a text

use anyhow::Result;

use crate::app::build_classifier;
use crate::config::Config;
use crate::integrations::MistralClient;

pub async fn run(config: &Config, text: &str) -> Result<()> {
    let mistral = MistralClient::with_url(&config.mistral_api_key, &config.mistral_url)?;
    let label = build_classifier(config, mistral).classify(text).await?;
    println!("{}", label);
    Ok(())
}
