//! Vitrine CLI entry point.
//!
//! Binary name: `vitrine`
//!
//! Parses CLI arguments, loads configuration, then dispatches to the
//! appropriate command handler. SIGINT requests cooperative cancellation:
//! the in-flight record finishes, the rest are skipped, and the report
//! still prints.

mod cli;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,vitrine=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let config = vitrine_infra::config::load_config(cli.config.as_deref()).await?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, finishing in-flight work");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Commands::Populate { snapshot, truncate } => {
            cli::populate::run(
                &config,
                cli.api_key,
                snapshot.as_deref(),
                truncate,
                cancel,
                cli.json,
            )
            .await
        }
        Commands::Embed { output } => {
            cli::embed::run(&config, cli.api_key, &output, cancel, cli.json).await
        }
        Commands::Verify => cli::verify::run(&config, cli.json).await,
        Commands::Search { query, limit } => {
            cli::search::run(&config, cli.api_key, &query, limit, cli.json).await
        }
    }
}
