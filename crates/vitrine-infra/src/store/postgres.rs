//! Postgres/pgvector implementation of the [`CatalogStore`] trait.
//!
//! One table holds the full catalog row plus its embedding in a
//! `VECTOR(D)` column, indexed with HNSW under cosine distance. All writes
//! are single-statement upserts (`INSERT ... ON CONFLICT (id) DO UPDATE`),
//! so concurrent population runs race safely at row granularity and
//! readers never observe a torn row.
//!
//! Embeddings cross the wire as pgvector text literals (`[0.1,0.2,...]`)
//! cast with `::vector`, and come back via `::text`.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use vitrine_core::store::CatalogStore;
use vitrine_types::catalog::{CatalogItem, CatalogRecord, Money};
use vitrine_types::config::StoreConfig;
use vitrine_types::error::StoreError;

/// Columns every compatible table must carry.
const REQUIRED_COLUMNS: [&str; 10] = [
    "id",
    "name",
    "description",
    "categories",
    "price_units",
    "price_nanos",
    "currency_code",
    "picture",
    "embedding_model",
    "product_embedding",
];

/// Postgres-backed catalog store.
///
/// Constructed with a fixed table name, embedding model identifier, and
/// vector dimension; `ensure_schema`/`validate_model` enforce them against
/// whatever already exists.
pub struct PostgresCatalogStore {
    pool: PgPool,
    table: String,
    model: String,
    dimension: usize,
}

impl PostgresCatalogStore {
    /// Connect with bounded retries and exponential backoff.
    ///
    /// Fails with `StoreError::Unavailable` once `connect_retries`
    /// attempts are exhausted.
    pub async fn connect(
        config: &StoreConfig,
        model: &str,
        dimension: usize,
    ) -> Result<Self, StoreError> {
        let retries = config.connect_retries.max(1);
        let mut attempt = 0u32;
        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(30))
                .connect(&config.url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) if attempt + 1 < retries => {
                    let delay = config.connect_retry_base() * 2u32.pow(attempt.min(5));
                    tracing::warn!(
                        attempt = attempt + 1,
                        retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "store connection failed, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(StoreError::Unavailable(e.to_string())),
            }
        };

        Self::new(pool, &config.table, model, dimension)
    }

    /// Wrap an existing pool.
    pub fn new(
        pool: PgPool,
        table: &str,
        model: &str,
        dimension: usize,
    ) -> Result<Self, StoreError> {
        if !is_valid_ident(table) {
            return Err(StoreError::Query(format!(
                "invalid table identifier '{table}'"
            )));
        }
        Ok(Self {
            pool,
            table: table.to_string(),
            model: model.to_string(),
            dimension,
        })
    }

    async fn check_existing_table(&self) -> Result<(), StoreError> {
        let columns: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT column_name::text FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = $1
            "#,
        )
        .bind(&self.table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        if columns.is_empty() {
            // No table yet; nothing to conflict with.
            return Ok(());
        }

        for required in REQUIRED_COLUMNS {
            if !columns.iter().any(|(name,)| name == required) {
                return Err(StoreError::SchemaConflict(format!(
                    "existing table '{}' is missing column '{required}'",
                    self.table
                )));
            }
        }

        // pgvector stores the declared dimension in atttypmod.
        let typmod: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT a.atttypmod
            FROM pg_attribute a
            JOIN pg_class c ON a.attrelid = c.oid
            JOIN pg_namespace n ON c.relnamespace = n.oid
            WHERE n.nspname = current_schema()
              AND c.relname = $1
              AND a.attname = 'product_embedding'
            "#,
        )
        .bind(&self.table)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        if let Some((dim,)) = typmod {
            if dim != self.dimension as i32 {
                return Err(StoreError::SchemaConflict(format!(
                    "existing table '{}' has {dim}-dimension vectors, expected {}",
                    self.table, self.dimension
                )));
            }
        }

        Ok(())
    }
}

impl CatalogStore for PostgresCatalogStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                StoreError::SchemaConflict(format!("failed to enable pgvector extension: {e}"))
            })?;

        self.check_existing_table().await?;

        sqlx::query(&create_table_sql(&self.table, self.dimension))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::SchemaConflict(e.to_string()))?;

        sqlx::query(&create_index_sql(&self.table))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::SchemaConflict(e.to_string()))?;

        tracing::debug!(table = %self.table, dimension = self.dimension, "schema ensured");
        Ok(())
    }

    async fn validate_model(&self) -> Result<(), StoreError> {
        let models: Vec<(String,)> =
            sqlx::query_as(&format!(
                "SELECT DISTINCT embedding_model FROM {}",
                self.table
            ))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        for (existing,) in models {
            if existing != self.model {
                return Err(StoreError::ModelMismatch {
                    existing,
                    requested: self.model.clone(),
                });
            }
        }
        Ok(())
    }

    async fn upsert(&self, record: &CatalogRecord) -> Result<(), StoreError> {
        sqlx::query(&upsert_sql(&self.table))
            .bind(&record.item.id)
            .bind(&record.item.name)
            .bind(&record.item.description)
            .bind(&record.item.categories)
            .bind(record.item.price.units)
            .bind(record.item.price.nanos)
            .bind(&record.item.price.currency_code)
            .bind(&record.item.picture)
            .bind(&record.embedding_model)
            .bind(vec_to_pgvector(&record.embedding))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Write {
                id: record.item.id.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.table))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(count as u64)
    }

    async fn sample(&self, n: usize) -> Result<Vec<CatalogRecord>, StoreError> {
        let rows: Vec<RecordRow> = sqlx::query_as(&sample_sql(&self.table))
            .bind(n as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        rows.into_iter().map(|row| row.into_record()).collect()
    }

    async fn search(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<(CatalogRecord, f32)>, StoreError> {
        let rows: Vec<SearchRow> = sqlx::query_as(&search_sql(&self.table))
            .bind(vec_to_pgvector(query))
            .bind(k as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let distance = row.distance as f32;
                row.record.into_record().map(|r| (r, distance))
            })
            .collect()
    }

    async fn truncate(&self) -> Result<u64, StoreError> {
        let result = sqlx::query(&format!("DELETE FROM {}", self.table))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: String,
    name: String,
    description: String,
    categories: Vec<String>,
    price_units: i64,
    price_nanos: i32,
    currency_code: String,
    picture: String,
    embedding_model: String,
    embedding: String,
}

impl RecordRow {
    fn into_record(self) -> Result<CatalogRecord, StoreError> {
        let embedding = parse_pgvector(&self.embedding)?;
        Ok(CatalogRecord {
            item: CatalogItem {
                id: self.id,
                name: self.name,
                description: self.description,
                categories: self.categories,
                price: Money {
                    currency_code: self.currency_code,
                    units: self.price_units,
                    nanos: self.price_nanos,
                },
                picture: self.picture,
            },
            embedding_model: self.embedding_model,
            embedding,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SearchRow {
    #[sqlx(flatten)]
    record: RecordRow,
    distance: f64,
}

fn create_table_sql(table: &str, dimension: usize) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            categories TEXT[] NOT NULL,
            price_units BIGINT NOT NULL,
            price_nanos INTEGER NOT NULL,
            currency_code TEXT NOT NULL,
            picture TEXT NOT NULL,
            embedding_model TEXT NOT NULL,
            product_embedding VECTOR({dimension}) NOT NULL
        )
        "#
    )
}

fn create_index_sql(table: &str) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {table}_embedding_idx ON {table} \
         USING hnsw (product_embedding vector_cosine_ops)"
    )
}

fn upsert_sql(table: &str) -> String {
    format!(
        r#"
        INSERT INTO {table}
            (id, name, description, categories, price_units, price_nanos,
             currency_code, picture, embedding_model, product_embedding)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10::vector)
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            description = EXCLUDED.description,
            categories = EXCLUDED.categories,
            price_units = EXCLUDED.price_units,
            price_nanos = EXCLUDED.price_nanos,
            currency_code = EXCLUDED.currency_code,
            picture = EXCLUDED.picture,
            embedding_model = EXCLUDED.embedding_model,
            product_embedding = EXCLUDED.product_embedding
        "#
    )
}

fn sample_sql(table: &str) -> String {
    format!(
        "SELECT id, name, description, categories, price_units, price_nanos, \
         currency_code, picture, embedding_model, product_embedding::text AS embedding \
         FROM {table} ORDER BY id LIMIT $1"
    )
}

fn search_sql(table: &str) -> String {
    format!(
        "SELECT id, name, description, categories, price_units, price_nanos, \
         currency_code, picture, embedding_model, product_embedding::text AS embedding, \
         (product_embedding <=> $1::vector)::float8 AS distance \
         FROM {table} ORDER BY product_embedding <=> $1::vector LIMIT $2"
    )
}

/// Render a vector as a pgvector text literal: `[0.1,0.2,0.3]`.
fn vec_to_pgvector(v: &[f32]) -> String {
    let mut out = String::with_capacity(v.len() * 12 + 2);
    out.push('[');
    for (i, x) in v.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&x.to_string());
    }
    out.push(']');
    out
}

/// Parse a pgvector text literal back into a vector.
fn parse_pgvector(text: &str) -> Result<Vec<f32>, StoreError> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| StoreError::Query(format!("invalid vector literal: {text}")))?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| StoreError::Query(format!("invalid vector component '{part}': {e}")))
        })
        .collect()
}

fn is_valid_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
