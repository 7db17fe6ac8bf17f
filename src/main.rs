//! rag_helpdesk CLI - main entry point
//!
//! Serves the helpdesk web app and exposes the pipelines as subcommands.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use rag_helpdesk::{commands, metrics, Config};
use tracing::warn;

#[derive(Parser)]
#[command(name = "rag_helpdesk")]
#[command(about = "Retrieval-augmented helpdesk chatbot", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    /// Config file (default: config.yml, then ../config.yml)
    #[arg(short, long, env = "RAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web application
    Serve {
        /// Listen address, overrides server.bind
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Build an index for each file (faiss_index_<stem>)
    Ingest {
        /// PDF or text files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print reports as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Answer a question from an index
    Ask {
        /// Index name, e.g. faiss_index_doc
        #[arg(short, long, default_value = "")]
        index: String,

        /// Question text
        question: String,

        /// Let the classifier choose between chat and retrieval
        #[arg(long, default_value_t = false)]
        route: bool,
    },

    /// Classify a text as chat or knowledge
    Classify {
        text: String,
    },

    /// List persisted indexes
    Indexes {
        /// Show manifest details and settings drift
        #[arg(short, long, default_value_t = false)]
        details: bool,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Serve { .. } => "serve",
            Commands::Ingest { .. } => "ingest",
            Commands::Ask { .. } => "ask",
            Commands::Classify { .. } => "classify",
            Commands::Indexes { .. } => "indexes",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("rag_helpdesk=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_file(path).map_err(anyhow::Error::msg)?,
        None => Config::new(),
    };

    let command_name = cli.command.name();
    metrics::record_command_start(command_name);
    let start = Instant::now();

    let result = execute_command(&config, cli.command).await;

    metrics::record_command_result(command_name, start.elapsed(), result.is_ok());

    result
}

async fn execute_command(config: &Config, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Serve { bind } => {
            commands::serve::run(config, bind.as_deref()).await?;
        }
        Commands::Ingest { files, json } => {
            commands::ingest::run(config, &files, json).await?;
        }
        Commands::Ask {
            index,
            question,
            route,
        } => {
            commands::ask::run(config, &index, &question, route).await?;
        }
        Commands::Classify { text } => {
            commands::classify::run(config, &text).await?;
        }
        Commands::Indexes { details } => {
            commands::indexes::run(config, details).await?;
        }
    }

    Ok(())
}
