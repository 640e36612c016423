//! Catalog file loading.
//!
//! Thin filesystem wrapper around the pure parser in `vitrine-core`.

use std::path::Path;

use vitrine_core::catalog::parse_catalog;
use vitrine_types::catalog::CatalogItem;
use vitrine_types::error::CatalogError;

/// Read and parse a catalog document from disk.
pub async fn load_catalog_file(path: &Path) -> Result<Vec<CatalogItem>, CatalogError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        CatalogError::Malformed(format!("failed to read {}: {e}", path.display()))
    })?;
    let items = parse_catalog(&content)?;
    tracing::info!(count = items.len(), path = %path.display(), "loaded catalog");
    Ok(items)
}
