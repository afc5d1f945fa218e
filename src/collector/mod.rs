//! Collection pipeline: artist resolution, paginated enumeration, batched
//! detail retrieval and the aggregation engine that merges it all.
//!
//! Every remote call goes through a [`crate::catalog_api::CatalogApi`]; the
//! components here own no I/O of their own.

mod cache;
mod detail_fetcher;
mod engine;
mod enumerator;
mod report;
mod resolver;

pub use cache::QueryCache;
pub use detail_fetcher::DetailFetcher;
pub use engine::{
    CollectionEngine, CollectionQuery, CollectionResult, CollectionStrategy, QueryKey,
};
pub use enumerator::{Enumerator, PaginationSettings};
pub use report::{ArtistOutcome, ArtistReport, CollectionReport, ReportSummary};
pub use resolver::ArtistResolver;

use crate::catalog_api::CatalogError;
use thiserror::Error;

/// Reason a single artist could not be collected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectError {
    #[error("artist not found: {0}")]
    ArtistNotFound(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl CollectError {
    /// True when the underlying catalog failure was retryable, i.e. the
    /// retries were exhausted and a later run may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CollectError::ArtistNotFound(_) => false,
            CollectError::Catalog(err) => err.is_retryable(),
        }
    }
}
