//! CLI command definitions and shared helpers for the `vitrine` binary.
//!
//! Uses clap derive macros for argument parsing. One subcommand per
//! pipeline operation: `populate`, `embed`, `verify`, `search`.

pub mod embed;
pub mod populate;
pub mod search;
pub mod verify;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use secrecy::SecretString;

use vitrine_types::config::PipelineConfig;

/// Populate and query the product catalog vector store.
#[derive(Parser)]
#[command(name = "vitrine", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file (defaults to ./vitrine.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Embedding API key.
    #[arg(long, env = "VITRINE_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Output machine-readable JSON instead of plain text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the catalog, generate embeddings, and upsert into the store.
    Populate {
        /// Reuse vectors from a saved snapshot instead of calling the API.
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Delete existing rows first. Upserts are idempotent, so this is
        /// only needed to drop rows that left the catalog.
        #[arg(long)]
        truncate: bool,
    },

    /// Generate embeddings and save them to a snapshot file.
    Embed {
        /// Snapshot file to write.
        #[arg(long, default_value = "product_embeddings.json")]
        output: PathBuf,
    },

    /// Check row count, model identity, and sample stored rows.
    Verify,

    /// Similarity-search the populated table.
    Search {
        /// Query text; embedded with the configured model.
        query: String,

        /// Number of results.
        #[arg(short = 'k', long = "limit", default_value_t = 4)]
        limit: usize,
    },
}

/// Take the API key or explain where it goes.
pub fn require_api_key(api_key: Option<String>) -> anyhow::Result<SecretString> {
    api_key
        .map(SecretString::from)
        .ok_or_else(|| anyhow::anyhow!("embedding API key required; set VITRINE_API_KEY"))
}

/// Pipeline options derived from configuration plus the truncate flag.
pub fn pipeline_options(
    config: &PipelineConfig,
    truncate: bool,
) -> vitrine_core::pipeline::PipelineOptions {
    vitrine_core::pipeline::PipelineOptions {
        batch_size: config.embedding.batch_size,
        batch_delay: config.embedding.batch_delay(),
        truncate,
    }
}
