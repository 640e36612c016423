//! Error taxonomy for the catalog population pipeline.
//!
//! Load-time and schema errors are fatal for a run; embedding and write
//! errors are per-item and collected into the run report instead of
//! aborting the batch.

use thiserror::Error;

/// Errors raised while loading the catalog document. Fatal for the run.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("malformed catalog: {0}")]
    Malformed(String),

    #[error("duplicate item '{id}' with conflicting content")]
    DuplicateItem { id: String },
}

/// Errors from the embedding API adapter.
///
/// `is_retryable` drives the bounded-backoff retry loop; once retries are
/// exhausted the error is recorded per item and the run continues.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("rate limited")]
    RateLimited,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider error (HTTP {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("expected {expected}-dimension vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("batch of {len} exceeds provider limit {limit}")]
    BatchTooLarge { len: usize, limit: usize },
}

impl EmbeddingError {
    /// Whether the failure is transient and worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::RateLimited | EmbeddingError::Transport(_) => true,
            EmbeddingError::Provider { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Errors from the vector store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("schema conflict: {0}")]
    SchemaConflict(String),

    #[error("table holds embeddings from model '{existing}', refusing to mix with '{requested}'")]
    ModelMismatch { existing: String, requested: String },

    #[error("write failed for '{id}': {reason}")]
    Write { id: String, reason: String },

    #[error("query error: {0}")]
    Query(String),
}

/// Run-fatal pipeline errors. Per-item failures never surface here; they
/// are collected into the run report.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors loading a saved embedding snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Malformed(String),

    #[error("snapshot entry '{id}' has a {actual}-dimension vector, expected {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors loading the pipeline configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::DuplicateItem {
            id: "OLJCESPC7Z".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "duplicate item 'OLJCESPC7Z' with conflicting content"
        );
    }

    #[test]
    fn test_embedding_error_retryable_classification() {
        assert!(EmbeddingError::RateLimited.is_retryable());
        assert!(EmbeddingError::Transport("connection reset".to_string()).is_retryable());
        assert!(
            EmbeddingError::Provider {
                status: 503,
                message: "overloaded".to_string()
            }
            .is_retryable()
        );
        assert!(
            !EmbeddingError::Provider {
                status: 400,
                message: "bad request".to_string()
            }
            .is_retryable()
        );
        assert!(!EmbeddingError::AuthenticationFailed.is_retryable());
        assert!(
            !EmbeddingError::DimensionMismatch {
                expected: 768,
                actual: 512
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_store_error_model_mismatch_names_both_models() {
        let err = StoreError::ModelMismatch {
            existing: "embedding-001".to_string(),
            requested: "embedding-002".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("embedding-001"));
        assert!(msg.contains("embedding-002"));
    }
}
