//! `vitrine populate` -- run the full pipeline.

use std::path::Path;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use vitrine_core::pipeline::{populate, Pipeline};
use vitrine_core::snapshot::{snapshot_records, Snapshot};
use vitrine_infra::catalog::load_catalog_file;
use vitrine_infra::embedding::GeminiEmbedder;
use vitrine_infra::store::PostgresCatalogStore;
use vitrine_types::config::PipelineConfig;
use vitrine_types::report::RunReport;

pub async fn run(
    config: &PipelineConfig,
    api_key: Option<String>,
    snapshot: Option<&Path>,
    truncate: bool,
    cancel: CancellationToken,
    json: bool,
) -> anyhow::Result<()> {
    let items = load_catalog_file(Path::new(&config.catalog.path)).await?;
    let store = PostgresCatalogStore::connect(
        &config.store,
        &config.embedding.model,
        config.embedding.dimension,
    )
    .await?;

    let report = match snapshot {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read snapshot {}", path.display()))?;
            let snapshot = Snapshot::from_json(&raw)?;
            anyhow::ensure!(
                snapshot.model == config.embedding.model,
                "snapshot was generated with model '{}' but config expects '{}'",
                snapshot.model,
                config.embedding.model
            );
            anyhow::ensure!(
                snapshot.dimension == config.embedding.dimension,
                "snapshot holds {}-dimension vectors but config expects {}",
                snapshot.dimension,
                config.embedding.dimension
            );

            let (records, mut failures) = snapshot_records(&items, &snapshot);
            let outcome = populate(&store, &records, truncate, &cancel).await?;
            failures.extend(outcome.failures);
            failures.sort_by_key(|f| f.index);
            RunReport {
                total: items.len(),
                upserted: outcome.upserted,
                embedding_model: snapshot.model,
                cancelled: outcome.cancelled,
                failures,
            }
        }
        None => {
            let embedder =
                GeminiEmbedder::new(super::require_api_key(api_key)?, &config.embedding);
            Pipeline::new(&embedder, &store, super::pipeline_options(config, truncate))
                .with_cancellation(cancel)
                .run(&items)
                .await?
        }
    };

    print_report(&report, json)?;

    if report.is_complete() {
        Ok(())
    } else if report.cancelled {
        anyhow::bail!(
            "run cancelled after {} of {} records",
            report.upserted,
            report.total
        )
    } else {
        anyhow::bail!("{} of {} records failed", report.failures.len(), report.total)
    }
}

fn print_report(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "Processed {} records with model '{}': {} upserted, {} failed{}",
        report.total,
        report.embedding_model,
        report.upserted,
        report.failures.len(),
        if report.cancelled { " (cancelled)" } else { "" }
    );
    for failure in &report.failures {
        println!("  {} [{}]: {}", failure.id, failure.stage, failure.reason);
    }
    Ok(())
}
