//! Shared domain types for Vitrine.
//!
//! This crate contains the core domain types used across the catalog
//! population pipeline: CatalogItem, CatalogRecord, run reports, pipeline
//! configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod catalog;
pub mod config;
pub mod error;
pub mod report;
