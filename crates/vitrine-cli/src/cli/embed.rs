//! `vitrine embed` -- generate embeddings and save them to a snapshot.
//!
//! The snapshot doubles as a backup for inspection and as input for
//! `populate --snapshot`, which replays the vectors without touching the
//! embedding API again.

use std::path::Path;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use vitrine_core::catalog::embedding_text;
use vitrine_core::embedder::Embedder;
use vitrine_core::pipeline::embed_catalog;
use vitrine_core::snapshot::{Snapshot, SnapshotEntry};
use vitrine_infra::catalog::load_catalog_file;
use vitrine_infra::embedding::GeminiEmbedder;
use vitrine_types::config::PipelineConfig;

pub async fn run(
    config: &PipelineConfig,
    api_key: Option<String>,
    output: &Path,
    cancel: CancellationToken,
    json: bool,
) -> anyhow::Result<()> {
    let items = load_catalog_file(Path::new(&config.catalog.path)).await?;
    let embedder = GeminiEmbedder::new(super::require_api_key(api_key)?, &config.embedding);

    let options = super::pipeline_options(config, false);
    let outcome = embed_catalog(&embedder, &items, &options, &cancel).await;

    let snapshot = Snapshot {
        model: embedder.model_name().to_string(),
        dimension: embedder.dimension(),
        entries: outcome
            .embedded
            .iter()
            .map(|(index, embedding)| SnapshotEntry {
                id: items[*index].id.clone(),
                embedding_text: embedding_text(&items[*index]),
                embedding: embedding.clone(),
            })
            .collect(),
    };

    tokio::fs::write(output, snapshot.to_json()?)
        .await
        .with_context(|| format!("failed to write snapshot {}", output.display()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "embedded": snapshot.entries.len(),
                "failed": outcome.failures.len(),
                "cancelled": outcome.cancelled,
                "output": output.display().to_string(),
            }))?
        );
    } else {
        println!(
            "Embedded {} of {} items with model '{}'; snapshot written to {}",
            snapshot.entries.len(),
            items.len(),
            snapshot.model,
            output.display()
        );
        for failure in &outcome.failures {
            println!("  {} [{}]: {}", failure.id, failure.stage, failure.reason);
        }
    }

    if outcome.cancelled {
        anyhow::bail!(
            "embedding cancelled after {} of {} items",
            snapshot.entries.len(),
            items.len()
        )
    }
    if !outcome.failures.is_empty() {
        anyhow::bail!("{} of {} items failed to embed", outcome.failures.len(), items.len())
    }
    Ok(())
}
