//! Pipeline configuration.
//!
//! All connection targets, model identity, and retry/rate-limit knobs are
//! explicit data passed into each component at construction. Nothing reads
//! ambient process-wide state; the API key travels separately as a secret.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Embedding API settings: model identity, rate limiting, and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding model identifier. Fixed for the lifetime of a populated
    /// table; the store refuses to mix vectors from different models.
    pub model: String,
    /// Output vector dimension for `model`.
    pub dimension: usize,
    /// Base URL of the embedding API.
    pub base_url: String,
    /// Texts per API request.
    pub batch_size: usize,
    /// Pause between consecutive batch requests.
    pub batch_delay_ms: u64,
    /// Attempts per batch before the failure is recorded and the run moves on.
    pub max_retries: u32,
    /// First backoff delay; doubles per attempt.
    pub retry_base_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "embedding-001".to_string(),
            dimension: 768,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            batch_size: 5,
            batch_delay_ms: 1_000,
            max_retries: 3,
            retry_base_ms: 500,
        }
    }
}

impl EmbeddingConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }
}

/// Vector store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Postgres connection URL. Credentials belong in the URL or in
    /// libpq-style environment handling, never hardcoded.
    pub url: String,
    /// Target table name.
    pub table: String,
    /// Connection attempts before the run fails with `StoreError::Unavailable`.
    pub connect_retries: u32,
    /// First connect backoff delay; doubles per attempt.
    pub connect_retry_base_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "postgres://postgres@localhost:5432/products".to_string(),
            table: "catalog_items".to_string(),
            connect_retries: 3,
            connect_retry_base_ms: 1_000,
        }
    }
}

impl StoreConfig {
    pub fn connect_retry_base(&self) -> Duration {
        Duration::from_millis(self.connect_retry_base_ms)
    }
}

/// Catalog source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path to the catalog document.
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "products.json".to_string(),
        }
    }
}

/// Top-level pipeline configuration, deserialized from `vitrine.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub catalog: CatalogConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.embedding.model, "embedding-001");
        assert_eq!(config.embedding.dimension, 768);
        assert_eq!(config.embedding.batch_size, 5);
        assert_eq!(config.embedding.batch_delay(), Duration::from_secs(1));
        assert_eq!(config.store.table, "catalog_items");
        assert_eq!(config.catalog.path, "products.json");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [embedding]
            model = "embedding-002"
            dimension = 1536

            [store]
            url = "postgres://app@db.internal:5432/products"
            "#,
        )
        .unwrap();

        assert_eq!(config.embedding.model, "embedding-002");
        assert_eq!(config.embedding.dimension, 1536);
        // Unspecified knobs keep their defaults
        assert_eq!(config.embedding.batch_size, 5);
        assert_eq!(config.store.url, "postgres://app@db.internal:5432/products");
        assert_eq!(config.store.table, "catalog_items");
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(config.embedding.max_retries, 3);
        assert_eq!(config.store.connect_retries, 3);
    }
}
