//! Index documents from the command line

use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::{error, info};

use crate::app::{build_embedder, build_ingestor, build_store};
use crate::config::Config;
use crate::ingest::IngestReport;
use crate::integrations::OllamaClient;

/// Index each file in turn. Files are read in place, not copied to the upload directory.
pub async fn run(config: &Config, files: &[PathBuf], json: bool) -> Result<()> {
    if files.is_empty() {
        bail!("no files given");
    }

    let ollama = OllamaClient::with_url(&config.ollama_url)?;
    let store = build_store(config)?;
    let ingestor = build_ingestor(config, build_embedder(config, &ollama), store);

    let mut reports: Vec<IngestReport> = Vec::with_capacity(files.len());
    let mut failures = 0usize;

    for path in files {
        match ingestor.ingest_file(path).await {
            Ok(report) => {
                info!(file = %path.display(), index = %report.index_name, "Indexed");
                reports.push(report);
            }
            Err(err) => {
                error!(file = %path.display(), "Failed to index: {}", err);
                failures += 1;
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!(
                "{}  {} document(s), {} chunk(s)",
                report.index_name, report.documents, report.chunks
            );
        }
    }

    if failures > 0 {
        bail!("{} of {} file(s) failed to index", failures, files.len());
    }
    Ok(())
}
