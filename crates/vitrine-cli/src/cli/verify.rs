//! `vitrine verify` -- post-population sanity checks.
//!
//! Compares the stored row count against the catalog, confirms model
//! identity, and prints a small sample. Needs no API key.

use std::path::Path;

use vitrine_core::store::CatalogStore;
use vitrine_infra::catalog::load_catalog_file;
use vitrine_infra::store::PostgresCatalogStore;
use vitrine_types::config::PipelineConfig;

pub async fn run(config: &PipelineConfig, json: bool) -> anyhow::Result<()> {
    let items = load_catalog_file(Path::new(&config.catalog.path)).await?;
    let store = PostgresCatalogStore::connect(
        &config.store,
        &config.embedding.model,
        config.embedding.dimension,
    )
    .await?;

    store.ensure_schema().await?;
    store.validate_model().await?;

    let stored = store.count().await?;
    let sample = store.sample(3).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "catalog_items": items.len(),
                "stored_rows": stored,
                "embedding_model": config.embedding.model,
                "sample": sample
                    .iter()
                    .map(|r| serde_json::json!({
                        "id": r.item.id,
                        "name": r.item.name,
                        "dimension": r.embedding.len(),
                    }))
                    .collect::<Vec<_>>(),
            }))?
        );
    } else {
        println!(
            "Catalog has {} items; store has {} rows (model '{}')",
            items.len(),
            stored,
            config.embedding.model
        );
        for record in &sample {
            println!(
                "  {}: {} ({}, {} categories, {}-dim embedding)",
                record.item.id,
                record.item.name,
                record.item.price,
                record.item.categories.len(),
                record.embedding.len()
            );
        }
    }

    if stored != items.len() as u64 {
        anyhow::bail!(
            "store has {stored} rows but the catalog has {} items",
            items.len()
        )
    }
    Ok(())
}
