//! Relevance ranking over paginated listings
//!
//! - scoring.rs: `Searchable` and the per-item relevance function
//! - engine.rs: `RelevanceSearchEngine` (single page, full traversal, multi-query merge)

pub mod engine;
pub mod scoring;

pub use engine::{Page, PageFetcher, RankedItem, RelevanceSearchEngine};
pub use scoring::{Query, Searchable, relevance, text_match};
