//! List persisted indexes

use anyhow::Result;
use tracing::warn;

use crate::app::build_store;
use crate::config::Config;

pub async fn run(config: &Config, details: bool) -> Result<()> {
    let store = build_store(config)?;
    let names = store.list().await?;

    if names.is_empty() {
        println!("No indexes found");
        return Ok(());
    }

    for name in &names {
        if !details {
            println!("{}", name);
            continue;
        }

        match store.manifest(name).await {
            Ok(m) => {
                println!(
                    "{}  source={} chunks={} dim={} model={} size={}/{} created={}",
                    name,
                    m.source,
                    m.chunk_count,
                    m.dimension,
                    m.embed_model,
                    m.chunk_size,
                    m.chunk_overlap,
                    m.created_at.format("%Y-%m-%d %H:%M:%S")
                );
                let drift = m.drift(config.chunk_size, config.chunk_overlap, &config.embed_model);
                if !drift.is_empty() {
                    println!("  settings differ from current config: {}", drift.join(", "));
                }
            }
            Err(err) => {
                warn!(index = %name, "No manifest: {}", err);
                println!("{}  (no manifest)", name);
            }
        }
    }

    Ok(())
}
