//! GeminiEmbedder -- concrete [`Embedder`] implementation for the Gemini
//! embedding API.
//!
//! Sends batches to `models/{model}:batchEmbedContents` and retries
//! transient failures (HTTP 429, 5xx, transport errors) with bounded
//! exponential backoff. One `embed` call maps to one HTTP request; the
//! pipeline controls batch sizing and inter-batch pacing.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and only exposed
//! when building the request URL; it never appears in Debug output or
//! logs.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use vitrine_core::embedder::Embedder;
use vitrine_types::config::EmbeddingConfig;
use vitrine_types::error::EmbeddingError;

/// Gemini embedding API client.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    dimension: usize,
    max_retries: u32,
    retry_base: Duration,
}

/// Texts per request accepted by the batch endpoint.
const PROVIDER_BATCH_LIMIT: usize = 100;

impl GeminiEmbedder {
    /// Create a new Gemini embedder from explicit configuration.
    pub fn new(api_key: SecretString, config: &EmbeddingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            max_retries: config.max_retries.max(1),
            retry_base: config.retry_base(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    #[allow(dead_code)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:batchEmbedContents",
            self.base_url, self.model
        )
    }

    fn build_request(&self, texts: &[String]) -> BatchEmbedRequest {
        let model = format!("models/{}", self.model);
        BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: model.clone(),
                    content: Content {
                        parts: vec![Part { text: text.clone() }],
                    },
                })
                .collect(),
        }
    }

    fn retry_backoff(&self, attempt: u32) -> Duration {
        self.retry_base * 2u32.pow(attempt.min(5))
    }

    /// One request/response round trip, no retries.
    async fn request_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.expose_secret())])
            .json(&self.build_request(texts))
            .send()
            .await
            .map_err(|e| EmbeddingError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => EmbeddingError::AuthenticationFailed,
                429 => EmbeddingError::RateLimited,
                code => EmbeddingError::Provider {
                    status: code,
                    message: body,
                },
            });
        }

        let parsed: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Deserialization(e.to_string()))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(EmbeddingError::Deserialization(format!(
                "provider returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }

        let mut vectors = Vec::with_capacity(parsed.embeddings.len());
        for embedding in parsed.embeddings {
            if embedding.values.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.values.len(),
                });
            }
            vectors.push(embedding.values);
        }
        Ok(vectors)
    }
}

// GeminiEmbedder intentionally does NOT derive Debug; the SecretString
// field keeps the key out of output, and omitting Debug removes the
// temptation entirely.

impl Embedder for GeminiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.len() > PROVIDER_BATCH_LIMIT {
            return Err(EmbeddingError::BatchTooLarge {
                len: texts.len(),
                limit: PROVIDER_BATCH_LIMIT,
            });
        }

        let mut attempt = 0u32;
        loop {
            match self.request_once(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if e.is_retryable() && attempt + 1 < self.max_retries => {
                    let delay = self.retry_backoff(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "embedding request failed, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Serialize)]
struct EmbedContentRequest {
    model: String,
    content: Content,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}
