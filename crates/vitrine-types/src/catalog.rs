//! Catalog item and persisted record types.
//!
//! `CatalogItem` mirrors one entry of the product catalog document
//! (`products.json`). `CatalogRecord` is the persisted row shape: the item
//! plus the embedding vector and the identifier of the model that produced
//! it. Prices are kept as integer units/nanos and never touch floating
//! point.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A fixed-point money amount with currency code.
///
/// `nanos` are billionths of one unit, matching the catalog document's
/// `priceUsd` shape. `19.99 USD` is `units = 19, nanos = 990_000_000`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    #[serde(default = "default_currency")]
    pub currency_code: String,
    #[serde(default)]
    pub units: i64,
    #[serde(default)]
    pub nanos: i32,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Money {
    /// Total amount in minor units (hundredths), truncating sub-cent nanos.
    pub fn minor_units(&self) -> i64 {
        self.units * 100 + i64::from(self.nanos) / 10_000_000
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02} {}",
            self.units,
            self.nanos / 10_000_000,
            self.currency_code
        )
    }
}

/// One product from the catalog document. Immutable once loaded.
///
/// `id` is the stable identifier and the primary key in the store.
/// `description` is the text the embedding is derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(rename = "priceUsd")]
    pub price: Money,
    #[serde(default)]
    pub picture: String,
}

/// A persisted catalog row: the item, its embedding, and the model that
/// produced the embedding.
///
/// The embedding is paired 1:1 with the item's description text; a record
/// is always written whole (insert-or-replace), never field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub item: CatalogItem,
    pub embedding_model: String,
    pub embedding: Vec<f32>,
}
