//! Catalog document parsing and embedding-text construction.
//!
//! The catalog is a JSON document of the shape
//! `{"products": [{id, name, description, picture, priceUsd, categories}]}`.
//! Parsing is a pure function of the input string: no side effects, no
//! network. Duplicate ids with conflicting payloads are rejected to prevent
//! silent corruption downstream; exact duplicates are dropped so an
//! identical re-load is a no-op.

use std::collections::HashMap;

use serde::Deserialize;

use vitrine_types::catalog::CatalogItem;
use vitrine_types::error::CatalogError;

#[derive(Deserialize)]
struct CatalogDocument {
    products: Vec<CatalogItem>,
}

/// Parse a catalog document into an ordered list of items.
///
/// Fails with `CatalogError::Malformed` when the document is unparsable or
/// an item is missing a required field, and `CatalogError::DuplicateItem`
/// when two items share an id but differ in content.
pub fn parse_catalog(input: &str) -> Result<Vec<CatalogItem>, CatalogError> {
    let document: CatalogDocument =
        serde_json::from_str(input).map_err(|e| CatalogError::Malformed(e.to_string()))?;

    let mut items: Vec<CatalogItem> = Vec::with_capacity(document.products.len());
    let mut seen: HashMap<String, usize> = HashMap::new();

    for item in document.products {
        validate_item(&item)?;
        match seen.get(&item.id) {
            Some(&index) => {
                if items[index] != item {
                    return Err(CatalogError::DuplicateItem { id: item.id });
                }
                // Exact duplicate: idempotent re-load, drop it.
            }
            None => {
                seen.insert(item.id.clone(), items.len());
                items.push(item);
            }
        }
    }

    Ok(items)
}

fn validate_item(item: &CatalogItem) -> Result<(), CatalogError> {
    if item.id.trim().is_empty() {
        return Err(CatalogError::Malformed("item with empty id".to_string()));
    }
    if item.name.trim().is_empty() {
        return Err(CatalogError::Malformed(format!(
            "item '{}' has an empty name",
            item.id
        )));
    }
    if item.description.trim().is_empty() {
        return Err(CatalogError::Malformed(format!(
            "item '{}' has an empty description",
            item.id
        )));
    }
    Ok(())
}

/// Build the text a product is embedded from.
///
/// Combines name, description, and categories into one passage so the
/// vector captures more than the bare description:
/// `"Sunglasses. Add a modern touch... Categories: accessories."`
pub fn embedding_text(item: &CatalogItem) -> String {
    let mut text = format!("{}. {}", item.name, item.description);
    if !item.categories.is_empty() {
        text.push_str(&format!(" Categories: {}.", item.categories.join(", ")));
    }
    text
}
