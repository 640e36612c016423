//! Infrastructure implementations for Vitrine.
//!
//! Concrete adapters behind the ports defined in `vitrine-core`: the
//! Gemini embedding API client, the Postgres/pgvector catalog store, an
//! in-memory store for tests and local smoke runs, plus configuration and
//! catalog file loading.

pub mod catalog;
pub mod config;
pub mod embedding;
pub mod store;
