//! `vitrine search` -- similarity-search the populated table.
//!
//! Embeds the query text with the configured model and prints the top-k
//! rows by ascending cosine distance. This is the same read path the
//! assistant service uses at request time.

use anyhow::Context;

use vitrine_core::embedder::Embedder;
use vitrine_core::store::CatalogStore;
use vitrine_infra::embedding::GeminiEmbedder;
use vitrine_infra::store::PostgresCatalogStore;
use vitrine_types::config::PipelineConfig;

pub async fn run(
    config: &PipelineConfig,
    api_key: Option<String>,
    query: &str,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let embedder = GeminiEmbedder::new(super::require_api_key(api_key)?, &config.embedding);
    let vectors = embedder.embed(&[query.to_string()]).await?;
    let query_vector = vectors
        .into_iter()
        .next()
        .context("provider returned no embedding for the query")?;

    let store = PostgresCatalogStore::connect(
        &config.store,
        &config.embedding.model,
        config.embedding.dimension,
    )
    .await?;

    let results = store.search(&query_vector, limit).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(
                &results
                    .iter()
                    .map(|(record, distance)| serde_json::json!({
                        "id": record.item.id,
                        "name": record.item.name,
                        "categories": record.item.categories,
                        "distance": distance,
                    }))
                    .collect::<Vec<_>>()
            )?
        );
    } else if results.is_empty() {
        println!("No results; is the store populated?");
    } else {
        for (record, distance) in &results {
            println!(
                "  {}  {}  (distance {:.4})",
                record.item.id, record.item.name, distance
            );
        }
    }

    Ok(())
}
