//! Catalog Collector Library
//!
//! Collects track metadata for a list of artists from a remote music
//! catalog, derives longevity metrics from it and exports the result.

pub mod catalog;
pub mod catalog_api;
pub mod collector;
pub mod config;
pub mod export;
pub mod metrics;

// Re-export commonly used types for convenience
pub use catalog::EnrichedTrackRecord;
pub use catalog_api::{CatalogApi, CatalogError, ResilientCatalog, WebCatalogClient};
pub use collector::{CollectionEngine, CollectionQuery, CollectionResult, CollectionStrategy};
