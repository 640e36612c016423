//! Catalog store trait and batch upsert.
//!
//! Defines the interface for the vector-indexed catalog table: idempotent
//! schema management, atomic keyed upsert, verification queries, and
//! cosine top-k search. Implementations (Postgres/pgvector, in-memory)
//! live in vitrine-infra.

use tokio_util::sync::CancellationToken;

use vitrine_types::catalog::CatalogRecord;
use vitrine_types::error::StoreError;
use vitrine_types::report::{FailureStage, ItemFailure};

/// Trait for the persisted catalog table with vector search.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in vitrine-infra. A store is constructed with a
/// fixed embedding model identifier and vector dimension; `ensure_schema`
/// and `validate_model` enforce them against existing state.
pub trait CatalogStore: Send + Sync {
    /// Create the table and vector index if absent. Idempotent; never
    /// drops or redefines existing state. Fails with
    /// `StoreError::SchemaConflict` when an existing table has an
    /// incompatible column set or vector dimension.
    fn ensure_schema(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Check that no stored row was embedded with a different model than
    /// this store is configured for. Fails with `StoreError::ModelMismatch`
    /// otherwise; mixing model versions in one table is a correctness
    /// hazard, not a degradation.
    fn validate_model(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Insert or fully replace the row keyed by `record.item.id`, embedding
    /// included, as one atomic statement (last-writer-wins).
    fn upsert(
        &self,
        record: &CatalogRecord,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Total stored rows.
    fn count(&self) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;

    /// Up to `n` rows for post-population spot checks.
    fn sample(
        &self,
        n: usize,
    ) -> impl std::future::Future<Output = Result<Vec<CatalogRecord>, StoreError>> + Send;

    /// Top-k rows by ascending cosine distance to `query`.
    fn search(
        &self,
        query: &[f32],
        k: usize,
    ) -> impl std::future::Future<Output = Result<Vec<(CatalogRecord, f32)>, StoreError>> + Send;

    /// Delete every row. Returns the number deleted.
    fn truncate(&self) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;
}

/// Result of a batch upsert: how many records committed, which failed,
/// and whether the batch stopped early on cancellation.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub upserted: usize,
    pub failures: Vec<ItemFailure>,
    pub cancelled: bool,
}

/// Upsert records in order with partial-success semantics.
///
/// A failure on one record is recorded with its identifier and does not
/// roll back previously-committed records. Cancellation is honored between
/// records: the in-flight record finishes, the rest are skipped.
pub async fn upsert_all<S: CatalogStore>(
    store: &S,
    records: &[(usize, CatalogRecord)],
    cancel: &CancellationToken,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for (index, record) in records {
        if cancel.is_cancelled() {
            tracing::info!(
                upserted = outcome.upserted,
                "cancellation requested, stopping before next record"
            );
            outcome.cancelled = true;
            break;
        }

        match store.upsert(record).await {
            Ok(()) => {
                tracing::debug!(id = %record.item.id, "upserted record");
                outcome.upserted += 1;
            }
            Err(e) => {
                tracing::warn!(id = %record.item.id, error = %e, "record upsert failed");
                outcome.failures.push(ItemFailure {
                    id: record.item.id.clone(),
                    index: *index,
                    stage: FailureStage::Store,
                    reason: e.to_string(),
                });
            }
        }
    }

    outcome
}

/// Cosine distance between two vectors: `1 - cos(a, b)`, in `[0, 2]`.
///
/// A zero-norm input has no direction; the distance defaults to 1.0
/// (maximally non-similar without being opposite).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}
