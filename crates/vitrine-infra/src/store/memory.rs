//! In-memory implementation of the [`CatalogStore`] trait.
//!
//! Exhaustive cosine search over a concurrent map. Not persisted; used by
//! tests and local smoke runs where a Postgres instance is not available.
//! Upsert and search are safe to call concurrently: rows are cloned out
//! whole, so a reader never observes a partially-written record.

use dashmap::DashMap;

use vitrine_core::store::{cosine_distance, CatalogStore};
use vitrine_types::catalog::CatalogRecord;
use vitrine_types::error::StoreError;

/// Volatile catalog store over a concurrent hash map.
pub struct InMemoryCatalogStore {
    model: String,
    dimension: usize,
    rows: DashMap<String, CatalogRecord>,
}

impl InMemoryCatalogStore {
    pub fn new(model: &str, dimension: usize) -> Self {
        Self {
            model: model.to_string(),
            dimension,
            rows: DashMap::new(),
        }
    }
}

impl CatalogStore for InMemoryCatalogStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        // Nothing to create; the map is the schema.
        Ok(())
    }

    async fn validate_model(&self) -> Result<(), StoreError> {
        for entry in self.rows.iter() {
            if entry.value().embedding_model != self.model {
                return Err(StoreError::ModelMismatch {
                    existing: entry.value().embedding_model.clone(),
                    requested: self.model.clone(),
                });
            }
        }
        Ok(())
    }

    async fn upsert(&self, record: &CatalogRecord) -> Result<(), StoreError> {
        if record.embedding.len() != self.dimension {
            return Err(StoreError::Write {
                id: record.item.id.clone(),
                reason: format!(
                    "expected {}-dimension embedding, got {}",
                    self.dimension,
                    record.embedding.len()
                ),
            });
        }
        self.rows.insert(record.item.id.clone(), record.clone());
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.rows.len() as u64)
    }

    async fn sample(&self, n: usize) -> Result<Vec<CatalogRecord>, StoreError> {
        let mut records: Vec<CatalogRecord> =
            self.rows.iter().map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| a.item.id.cmp(&b.item.id));
        records.truncate(n);
        Ok(records)
    }

    async fn search(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<(CatalogRecord, f32)>, StoreError> {
        let mut scored: Vec<(CatalogRecord, f32)> = self
            .rows
            .iter()
            .map(|e| {
                let record = e.value().clone();
                let distance = cosine_distance(query, &record.embedding);
                (record, distance)
            })
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn truncate(&self) -> Result<u64, StoreError> {
        let count = self.rows.len() as u64;
        self.rows.clear();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use vitrine_core::catalog::{embedding_text, parse_catalog};
    use vitrine_core::embedder::Embedder;
    use vitrine_core::pipeline::{Pipeline, PipelineOptions};
    use vitrine_types::catalog::{CatalogItem, Money};
    use vitrine_types::error::EmbeddingError;

    use super::*;

    fn record(id: &str, embedding: Vec<f32>) -> CatalogRecord {
        CatalogRecord {
            item: CatalogItem {
                id: id.to_string(),
                name: format!("Item {id}"),
                description: format!("Description of {id}."),
                categories: vec!["test".to_string()],
                price: Money {
                    currency_code: "USD".to_string(),
                    units: 10,
                    nanos: 0,
                },
                picture: String::new(),
            },
            embedding_model: "test-model".to_string(),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let store = InMemoryCatalogStore::new("test-model", 3);
        for _ in 0..5 {
            store.ensure_schema().await.unwrap();
        }
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_replaces_all_fields() {
        let store = InMemoryCatalogStore::new("test-model", 3);

        store.upsert(&record("A", vec![1.0, 0.0, 0.0])).await.unwrap();

        let mut updated = record("A", vec![0.0, 1.0, 0.0]);
        updated.item.name = "Renamed".to_string();
        store.upsert(&updated).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let rows = store.sample(1).await.unwrap();
        assert_eq!(rows[0].item.name, "Renamed");
        // The previous embedding is gone
        assert_eq!(rows[0].embedding, vec![0.0, 1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_upsert_rejects_wrong_dimension() {
        let store = InMemoryCatalogStore::new("test-model", 3);
        let err = store.upsert(&record("A", vec![1.0, 0.0])).await.unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_validate_model_detects_mismatch() {
        let store = InMemoryCatalogStore::new("current-model", 3);
        let mut foreign = record("A", vec![1.0, 0.0, 0.0]);
        foreign.embedding_model = "old-model".to_string();
        store.upsert(&foreign).await.unwrap();

        let err = store.validate_model().await.unwrap_err();
        match err {
            StoreError::ModelMismatch { existing, requested } => {
                assert_eq!(existing, "old-model");
                assert_eq!(requested, "current-model");
            }
            other => panic!("expected ModelMismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_orders_by_ascending_distance() {
        let store = InMemoryCatalogStore::new("test-model", 3);
        store.upsert(&record("A", vec![1.0, 0.0, 0.0])).await.unwrap();
        store.upsert(&record("B", vec![0.8, 0.6, 0.0])).await.unwrap();
        store.upsert(&record("C", vec![0.0, 0.0, 1.0])).await.unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.item.id, "A");
        assert_eq!(results[1].0.item.id, "B");
        assert!(results[0].1 <= results[1].1);
    }

    #[tokio::test]
    async fn test_search_k_bounded_by_table_size() {
        let store = InMemoryCatalogStore::new("test-model", 3);
        store.upsert(&record("A", vec![1.0, 0.0, 0.0])).await.unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_sample_is_ordered_and_bounded() {
        let store = InMemoryCatalogStore::new("test-model", 3);
        for id in ["C", "A", "B"] {
            store.upsert(&record(id, vec![1.0, 0.0, 0.0])).await.unwrap();
        }

        let rows = store.sample(2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].item.id, "A");
        assert_eq!(rows[1].item.id, "B");
    }

    #[tokio::test]
    async fn test_truncate_returns_deleted_count() {
        let store = InMemoryCatalogStore::new("test-model", 3);
        store.upsert(&record("A", vec![1.0, 0.0, 0.0])).await.unwrap();
        store.upsert(&record("B", vec![0.0, 1.0, 0.0])).await.unwrap();

        assert_eq!(store.truncate().await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    // --- full-catalog scenario ---

    /// The demo boutique catalog, as shipped in the product catalog
    /// service's `products.json`.
    const BOUTIQUE_CATALOG: &str = r#"{"products": [
        {"id": "OLJCESPC7Z", "name": "Sunglasses",
         "description": "Add a modern touch to your outfits with these sleek aviator sunglasses.",
         "picture": "/static/img/products/sunglasses.jpg",
         "priceUsd": {"currencyCode": "USD", "units": 19, "nanos": 990000000},
         "categories": ["accessories"]},
        {"id": "66VCHSJNUP", "name": "Tank Top",
         "description": "Perfectly cropped cotton tank, with a scooped neckline.",
         "picture": "/static/img/products/tank-top.jpg",
         "priceUsd": {"currencyCode": "USD", "units": 18, "nanos": 990000000},
         "categories": ["clothing", "tops"]},
        {"id": "1YMWWN1N4O", "name": "Watch",
         "description": "This gold-tone stainless steel watch will work with most of your outfits.",
         "picture": "/static/img/products/watch.jpg",
         "priceUsd": {"currencyCode": "USD", "units": 109, "nanos": 990000000},
         "categories": ["accessories"]},
        {"id": "L9ECAV7KIM", "name": "Loafers",
         "description": "A neat addition to your summer wardrobe.",
         "picture": "/static/img/products/loafers.jpg",
         "priceUsd": {"currencyCode": "USD", "units": 89, "nanos": 990000000},
         "categories": ["footwear"]},
        {"id": "2ZYFJ3GM2N", "name": "Hairdryer",
         "description": "This lightweight hairdryer has 3 heat and speed settings. It's perfect for travel.",
         "picture": "/static/img/products/hairdryer.jpg",
         "priceUsd": {"currencyCode": "USD", "units": 24, "nanos": 990000000},
         "categories": ["hair", "beauty"]},
        {"id": "0PUK6V6EV0", "name": "Candle Holder",
         "description": "This small but intricate candle holder is an excellent gift.",
         "picture": "/static/img/products/candle-holder.jpg",
         "priceUsd": {"currencyCode": "USD", "units": 18, "nanos": 990000000},
         "categories": ["decor", "home"]},
        {"id": "LS4PSXUNUM", "name": "Salt & Pepper Shakers",
         "description": "Add some flavor to your kitchen.",
         "picture": "/static/img/products/salt-and-pepper-shakers.jpg",
         "priceUsd": {"currencyCode": "USD", "units": 18, "nanos": 990000000},
         "categories": ["kitchen", "home"]},
        {"id": "9SIQT8TOJO", "name": "Vintage Typewriter",
         "description": "This typewriter looks good in your living room.",
         "picture": "/static/img/products/typewriter.jpg",
         "priceUsd": {"currencyCode": "USD", "units": 67, "nanos": 990000000},
         "categories": ["vintage", "decor", "home"]},
        {"id": "6E92ZMYYFZ", "name": "Film Camera",
         "description": "This camera looks like it's a few decades old but it's actually brand new.",
         "picture": "/static/img/products/film-camera.jpg",
         "priceUsd": {"currencyCode": "USD", "units": 2245, "nanos": 0},
         "categories": ["photography", "vintage"]}
    ]}"#;

    /// Toy semantic embedder: one axis per category keyword, so texts
    /// sharing category words land close under cosine distance.
    struct KeywordEmbedder;

    const KEYWORDS: [&str; 11] = [
        "accessories",
        "clothing",
        "tops",
        "footwear",
        "hair",
        "beauty",
        "decor",
        "home",
        "kitchen",
        "vintage",
        "photography",
    ];

    impl KeywordEmbedder {
        fn vector_for(text: &str) -> Vec<f32> {
            let lowered = text.to_lowercase();
            KEYWORDS
                .iter()
                .map(|kw| lowered.matches(kw).count() as f32)
                .collect()
        }
    }

    impl Embedder for KeywordEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
        }

        fn model_name(&self) -> &str {
            "keyword-test-model"
        }

        fn dimension(&self) -> usize {
            KEYWORDS.len()
        }
    }

    #[tokio::test]
    async fn test_boutique_catalog_scenario() {
        let items = parse_catalog(BOUTIQUE_CATALOG).unwrap();
        assert_eq!(items.len(), 9);

        let embedder = KeywordEmbedder;
        let store = InMemoryCatalogStore::new(embedder.model_name(), embedder.dimension());
        let options = PipelineOptions {
            batch_size: 5,
            batch_delay: std::time::Duration::ZERO,
            truncate: false,
        };

        let pipeline = Pipeline::new(&embedder, &store, options);
        let report = pipeline.run(&items).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(store.count().await.unwrap(), 9);

        // Query for accessories: Sunglasses and Watch must outrank the
        // Vintage Typewriter.
        let query = KeywordEmbedder::vector_for("stylish accessories");
        let results = store.search(&query, 3).await.unwrap();

        let top_ids: Vec<&str> = results.iter().map(|(r, _)| r.item.id.as_str()).collect();
        assert!(top_ids.contains(&"OLJCESPC7Z"), "Sunglasses in top 3: {top_ids:?}");
        assert!(top_ids.contains(&"1YMWWN1N4O"), "Watch in top 3: {top_ids:?}");

        let typewriter_distance = {
            let all = store.search(&query, 9).await.unwrap();
            all.iter()
                .find(|(r, _)| r.item.id == "9SIQT8TOJO")
                .map(|(_, d)| *d)
                .unwrap()
        };
        for (record, distance) in &results[..2] {
            assert!(
                *distance < typewriter_distance,
                "{} should rank above the typewriter",
                record.item.name
            );
        }

        // Running the pipeline again changes nothing
        let report = pipeline.run(&items).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(store.count().await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_cancellation_between_records() {
        let store = InMemoryCatalogStore::new("keyword-test-model", KEYWORDS.len());
        let embedder = KeywordEmbedder;
        let items = parse_catalog(BOUTIQUE_CATALOG).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let pipeline = Pipeline::new(
            &embedder,
            &store,
            PipelineOptions {
                batch_size: 5,
                batch_delay: std::time::Duration::ZERO,
                truncate: false,
            },
        )
        .with_cancellation(cancel);

        let report = pipeline.run(&items).await.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.upserted, 0);
    }

    #[tokio::test]
    async fn test_embedding_text_includes_categories() {
        let items = parse_catalog(BOUTIQUE_CATALOG).unwrap();
        let sunglasses = &items[0];
        let text = embedding_text(sunglasses);
        assert!(text.starts_with("Sunglasses."));
        assert!(text.ends_with("Categories: accessories."));
    }
}
