//! Collection search / 合集搜索
//!
//! Two tiers: a full-text MATCH over the collections_fts index, and a
//! permissive case-insensitive substring fallback that only runs when the
//! full-text tier comes up short.

pub mod engine;
pub mod query;

pub use engine::search_collections;
pub use query::{query_terms, sanitize_query};
