//! Embedding snapshots.
//!
//! A snapshot is a JSON file of `(id, embedding_text, vector)` triples
//! written by the `embed` command. A later `populate --snapshot` run reuses
//! the saved vectors instead of calling the embedding API again -- useful
//! both as a backup for inspection and as a resume point after partial
//! failures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use vitrine_types::catalog::{CatalogItem, CatalogRecord};
use vitrine_types::error::SnapshotError;
use vitrine_types::report::{FailureStage, ItemFailure};

/// One saved embedding: the item id, the exact text that was embedded,
/// and the resulting vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub id: String,
    pub embedding_text: String,
    pub embedding: Vec<f32>,
}

/// A saved set of embeddings, tied to the model and dimension that
/// produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub model: String,
    pub dimension: usize,
    pub entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    /// Parse and validate a snapshot document.
    ///
    /// Every entry's vector must match the declared dimension; a snapshot
    /// with mixed dimensions is corrupt, not partially usable.
    pub fn from_json(input: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot =
            serde_json::from_str(input).map_err(|e| SnapshotError::Malformed(e.to_string()))?;

        for entry in &snapshot.entries {
            if entry.embedding.len() != snapshot.dimension {
                return Err(SnapshotError::DimensionMismatch {
                    id: entry.id.clone(),
                    expected: snapshot.dimension,
                    actual: entry.embedding.len(),
                });
            }
        }

        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(|e| SnapshotError::Malformed(e.to_string()))
    }
}

/// Pair catalog items with their snapshot vectors, in catalog order.
///
/// Items without a saved vector become embed-stage failures so the run
/// report names exactly what still needs embedding; they do not abort the
/// records that are present.
pub fn snapshot_records(
    items: &[CatalogItem],
    snapshot: &Snapshot,
) -> (Vec<(usize, CatalogRecord)>, Vec<ItemFailure>) {
    let by_id: HashMap<&str, &SnapshotEntry> = snapshot
        .entries
        .iter()
        .map(|e| (e.id.as_str(), e))
        .collect();

    let mut records = Vec::with_capacity(items.len());
    let mut failures = Vec::new();

    for (index, item) in items.iter().enumerate() {
        match by_id.get(item.id.as_str()) {
            Some(entry) => records.push((
                index,
                CatalogRecord {
                    item: item.clone(),
                    embedding_model: snapshot.model.clone(),
                    embedding: entry.embedding.clone(),
                },
            )),
            None => failures.push(ItemFailure {
                id: item.id.clone(),
                index,
                stage: FailureStage::Embed,
                reason: "no embedding in snapshot".to_string(),
            }),
        }
    }

    (records, failures)
}
