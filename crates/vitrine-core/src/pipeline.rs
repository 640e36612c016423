//! Pipeline orchestration: load -> embed -> upsert -> report.
//!
//! One run processes one bounded, in-memory catalog, sequentially. The
//! embedding stage completes before the store stage begins, so no store
//! connection or transaction is ever held across an embedding-API call.
//! Per-item failures are collected into the run report; only catalog,
//! schema, and model-identity problems abort a run.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use vitrine_types::catalog::{CatalogItem, CatalogRecord};
use vitrine_types::error::PipelineError;
use vitrine_types::report::{FailureStage, ItemFailure, RunReport};

use crate::catalog::embedding_text;
use crate::embedder::Embedder;
use crate::store::{upsert_all, BatchOutcome, CatalogStore};

/// Tuning knobs for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Texts per embedding request.
    pub batch_size: usize,
    /// Pause between consecutive embedding requests; the rate-limit
    /// courtesy delay from the provider's point of view.
    pub batch_delay: Duration,
    /// Delete existing rows before upserting. Upsert idempotence makes
    /// this unnecessary for normal runs.
    pub truncate: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay: Duration::from_secs(1),
            truncate: false,
        }
    }
}

/// Result of the embedding stage.
///
/// `embedded` holds `(catalog_index, vector)` pairs in catalog order;
/// failed indices appear in `failures` instead, so a caller can resume
/// from the failure point rather than restart from scratch.
#[derive(Debug, Default)]
pub struct EmbedOutcome {
    pub embedded: Vec<(usize, Vec<f32>)>,
    pub failures: Vec<ItemFailure>,
    pub cancelled: bool,
}

/// Embed a catalog one batch at a time.
///
/// Batches are issued sequentially with a fixed delay between them; a
/// batch that fails (after the adapter's own bounded retries) marks each
/// of its items failed and the remaining batches still run. Cancellation
/// is honored between batches.
pub async fn embed_catalog<E: Embedder>(
    embedder: &E,
    items: &[CatalogItem],
    options: &PipelineOptions,
    cancel: &CancellationToken,
) -> EmbedOutcome {
    let mut outcome = EmbedOutcome::default();
    let batch_size = options.batch_size.max(1);
    let total_batches = items.len().div_ceil(batch_size);

    for (batch_no, batch) in items.chunks(batch_size).enumerate() {
        if cancel.is_cancelled() {
            tracing::info!(
                embedded = outcome.embedded.len(),
                "cancellation requested, stopping before next batch"
            );
            outcome.cancelled = true;
            break;
        }

        if batch_no > 0 && !options.batch_delay.is_zero() {
            tokio::time::sleep(options.batch_delay).await;
        }

        let start = batch_no * batch_size;
        let texts: Vec<String> = batch.iter().map(embedding_text).collect();
        tracing::info!(
            batch = batch_no + 1,
            total_batches,
            items = batch.len(),
            "embedding batch"
        );

        match embedder.embed(&texts).await {
            Ok(vectors) if vectors.len() == batch.len() => {
                for (offset, vector) in vectors.into_iter().enumerate() {
                    outcome.embedded.push((start + offset, vector));
                }
            }
            Ok(vectors) => {
                // A miscounted response cannot be paired back to its inputs.
                let reason = format!(
                    "provider returned {} vectors for {} inputs",
                    vectors.len(),
                    batch.len()
                );
                tracing::warn!(batch = batch_no + 1, %reason, "discarding batch");
                outcome.extend_failures(batch, start, &reason);
            }
            Err(e) => {
                tracing::warn!(batch = batch_no + 1, error = %e, "embedding batch failed");
                outcome.extend_failures(batch, start, &e.to_string());
            }
        }
    }

    outcome
}

impl EmbedOutcome {
    fn extend_failures(&mut self, batch: &[CatalogItem], start: usize, reason: &str) {
        for (offset, item) in batch.iter().enumerate() {
            self.failures.push(ItemFailure {
                id: item.id.clone(),
                index: start + offset,
                stage: FailureStage::Embed,
                reason: reason.to_string(),
            });
        }
    }
}

/// Populate the store with embedded records: ensure schema, enforce model
/// identity, optionally truncate, then batch-upsert in catalog order.
///
/// Schema and model-identity failures are fatal and happen before any row
/// is touched; write failures are per-record.
pub async fn populate<S: CatalogStore>(
    store: &S,
    records: &[(usize, CatalogRecord)],
    truncate: bool,
    cancel: &CancellationToken,
) -> Result<BatchOutcome, PipelineError> {
    store.ensure_schema().await.map_err(PipelineError::Store)?;
    store.validate_model().await.map_err(PipelineError::Store)?;

    if truncate {
        let deleted = store.truncate().await.map_err(PipelineError::Store)?;
        tracing::info!(deleted, "cleared existing rows");
    }

    Ok(upsert_all(store, records, cancel).await)
}

/// The full pipeline over an embedder and a store.
pub struct Pipeline<'a, E, S> {
    embedder: &'a E,
    store: &'a S,
    options: PipelineOptions,
    cancel: CancellationToken,
}

impl<'a, E: Embedder, S: CatalogStore> Pipeline<'a, E, S> {
    pub fn new(embedder: &'a E, store: &'a S, options: PipelineOptions) -> Self {
        Self {
            embedder,
            store,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an external cancellation token (e.g. wired to SIGINT).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the pipeline over already-loaded catalog items.
    ///
    /// Never aborts on per-item failures; the report names every failed
    /// identifier with its stage and cause.
    pub async fn run(&self, items: &[CatalogItem]) -> Result<RunReport, PipelineError> {
        let model = self.embedder.model_name().to_string();
        tracing::info!(total = items.len(), model = %model, "starting pipeline run");

        let embed = embed_catalog(self.embedder, items, &self.options, &self.cancel).await;

        let records: Vec<(usize, CatalogRecord)> = embed
            .embedded
            .into_iter()
            .map(|(index, embedding)| {
                (
                    index,
                    CatalogRecord {
                        item: items[index].clone(),
                        embedding_model: model.clone(),
                        embedding,
                    },
                )
            })
            .collect();

        let stored = populate(self.store, &records, self.options.truncate, &self.cancel).await?;

        let mut failures = embed.failures;
        failures.extend(stored.failures);
        failures.sort_by_key(|f| f.index);

        let report = RunReport {
            total: items.len(),
            upserted: stored.upserted,
            embedding_model: model,
            cancelled: embed.cancelled || stored.cancelled,
            failures,
        };
        tracing::info!(
            total = report.total,
            upserted = report.upserted,
            failed = report.failures.len(),
            cancelled = report.cancelled,
            "pipeline run finished"
        );
        Ok(report)
    }
}
