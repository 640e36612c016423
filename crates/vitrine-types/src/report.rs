//! Run report types.
//!
//! A pipeline run never aborts on a per-item failure; it records which
//! items failed at which stage and finishes the rest. The report carries
//! enough detail for a caller to retry exactly the failed identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The pipeline stage at which an item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Embed,
    Store,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Embed => write!(f, "embed"),
            FailureStage::Store => write!(f, "store"),
        }
    }
}

/// One failed item: its identifier, its position in catalog order, the
/// stage that failed, and the underlying cause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFailure {
    pub id: String,
    pub index: usize,
    pub stage: FailureStage,
    pub reason: String,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Items read from the catalog.
    pub total: usize,
    /// Items embedded and committed to the store.
    pub upserted: usize,
    /// Model identifier used for every embedding in this run.
    pub embedding_model: String,
    /// True when the run was cancelled before finishing; committed records
    /// stay committed.
    pub cancelled: bool,
    pub failures: Vec<ItemFailure>,
}

impl RunReport {
    /// True when every catalog item was upserted.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failures.is_empty() && self.upserted == self.total
    }

    /// Identifiers of the failed items, in catalog order.
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.id.as_str()).collect()
    }
}
