//! Embedder trait for text-to-vector conversion.
//!
//! Defines the interface for embedding catalog text into vectors.
//! Implementations (the Gemini API client, test fakes) live in
//! vitrine-infra.

use vitrine_types::error::EmbeddingError;

/// Trait for converting text into embedding vectors.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in vitrine-infra.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts into vectors.
    ///
    /// Returns exactly one vector per input text, in input order. One call
    /// maps to one provider request; callers control batch sizing and
    /// pacing between calls.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send;

    /// The model identifier used for embeddings (e.g., "embedding-001").
    fn model_name(&self) -> &str;

    /// The dimensionality of the output vectors.
    fn dimension(&self) -> usize;
}
