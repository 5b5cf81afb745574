use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Knowledge base with local or Pinecone-backed semantic search", long_about = None)]
struct Cli {
    /// Config file (default: ~/.kbase/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a piece of knowledge
    Add {
        /// Text to store
        text: String,

        /// Metadata as key=value (repeatable)
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,
    },

    /// Add UTF-8 text files, one record per file
    Ingest {
        /// Files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Search for knowledge similar to a query
    Search {
        /// Query text
        query: String,

        /// Maximum number of results (default: from config, else 3)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Minimum similarity score (default: from config, else 0.3)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Output results as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List stored knowledge (local backend only)
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show one entry by id
    Get {
        id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Delete an entry by id
    Delete { id: String },

    /// Show store statistics
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Interactive session over a single store
    Shell,

    /// Manage embedding models
    Model {
        #[command(subcommand)]
        command: Option<commands::model::ModelCommands>,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "kbase=debug" } else { "kbase=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Add { text, meta } => {
            commands::knowledge::add(config, &text, &meta)?;
        }
        Commands::Ingest { files } => {
            commands::knowledge::ingest(config, &files)?;
        }
        Commands::Search {
            query,
            top_k,
            threshold,
            json,
        } => {
            commands::knowledge::search(config, &query, top_k, threshold, json)?;
        }
        Commands::List { json } => {
            commands::knowledge::list(config, json)?;
        }
        Commands::Get { id, json } => {
            commands::knowledge::get(config, &id, json)?;
        }
        Commands::Delete { id } => {
            commands::knowledge::delete(config, &id)?;
        }
        Commands::Stats { json } => {
            commands::knowledge::stats(config, json)?;
        }
        Commands::Shell => {
            commands::shell::execute(config)?;
        }
        Commands::Model { command } => {
            commands::model::execute_cli(command)?;
        }
    }

    Ok(())
}
