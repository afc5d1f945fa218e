//! Remote catalog adapter.
//!
//! [`CatalogApi`] is the only seam allowed to perform network I/O. The
//! [`WebCatalogClient`] talks HTTP; [`ResilientCatalog`] wraps any
//! implementation with request pacing and the retry policy.

mod client;
mod error;
#[cfg(test)]
pub(crate) mod mock;
mod pacer;
mod resilient;
mod retry_policy;
mod wire;

pub use client::{ClientCredentials, WebCatalogClient};
pub use error::CatalogError;
pub use pacer::{RequestPacer, Sleeper, TokioSleeper};
pub use resilient::ResilientCatalog;
pub use retry_policy::RetryPolicy;

use async_trait::async_trait;

use crate::catalog::{AlbumRecord, AlbumType, ArtistRef, TrackRecord};

/// One page of an offset-paginated listing.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// False once the catalog signalled the end of the listing
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { items, has_more }
    }
}

/// Operations consumed from the remote catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Best match for an artist name (limit 1), `None` when nothing matches.
    async fn search_artist(&self, name: &str) -> Result<Option<ArtistRef>, CatalogError>;

    /// Keyword / genre track search.
    async fn search_tracks(
        &self,
        query: &str,
        market: Option<&str>,
        page_size: usize,
        offset: usize,
    ) -> Result<Page<TrackRecord>, CatalogError>;

    /// Albums of an artist restricted to one album type.
    async fn list_albums(
        &self,
        artist_id: &str,
        album_type: AlbumType,
        market: Option<&str>,
        page_size: usize,
        offset: usize,
    ) -> Result<Page<AlbumRecord>, CatalogError>;

    /// Track ids of an album.
    async fn list_tracks(
        &self,
        album_id: &str,
        page_size: usize,
        offset: usize,
    ) -> Result<Page<String>, CatalogError>;

    /// Full records for up to one batch of ids, position-aligned with `ids`.
    /// Deleted or restricted tracks come back as `None`.
    async fn get_track_details(
        &self,
        ids: &[String],
        market: Option<&str>,
    ) -> Result<Vec<Option<TrackRecord>>, CatalogError>;
}
