use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::{AlbumRecord, AlbumType, YearRange};
use crate::catalog_api::{CatalogApi, CatalogError, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSettings {
    /// Items requested per page
    pub page_size: usize,
    /// Upper bound on pages fetched by one listing walk
    pub max_pages: usize,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_pages: 2000,
        }
    }
}

/// Walks offset-paginated album and track listings.
pub struct Enumerator {
    catalog: Arc<dyn CatalogApi>,
    pagination: PaginationSettings,
}

impl Enumerator {
    pub fn new(catalog: Arc<dyn CatalogApi>, pagination: PaginationSettings) -> Self {
        Self {
            catalog,
            pagination,
        }
    }

    /// Albums of an artist across all `album_types`, in first-seen order.
    ///
    /// An album listed under several types is kept once. When a year window is
    /// given, albums with a missing or malformed release date are excluded.
    pub async fn enumerate_albums(
        &self,
        artist_id: &str,
        album_types: &[AlbumType],
        market: Option<&str>,
        year_range: Option<YearRange>,
    ) -> Result<Vec<AlbumRecord>, CatalogError> {
        let page_size = self.pagination.page_size;
        let mut seen = HashSet::new();
        let mut albums = Vec::new();

        for &album_type in album_types {
            let listed = self
                .walk_pages(&format!("{} albums of {}", album_type, artist_id), |offset| {
                    self.catalog
                        .list_albums(artist_id, album_type, market, page_size, offset)
                })
                .await?;

            for album in listed {
                if !seen.insert(album.album_id.clone()) {
                    continue;
                }
                if let Some(range) = year_range {
                    if !range.matches(album.release_date.as_deref()) {
                        continue;
                    }
                }
                albums.push(album);
            }
        }

        debug!("Enumerated {} albums for artist {}", albums.len(), artist_id);
        Ok(albums)
    }

    /// Track ids of an album in listing order.
    pub async fn enumerate_tracks(&self, album_id: &str) -> Result<Vec<String>, CatalogError> {
        let page_size = self.pagination.page_size;
        self.walk_pages(&format!("tracks of album {}", album_id), |offset| {
            self.catalog.list_tracks(album_id, page_size, offset)
        })
        .await
    }

    async fn walk_pages<T, F, Fut>(&self, listing: &str, mut fetch: F) -> Result<Vec<T>, CatalogError>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<Page<T>, CatalogError>>,
    {
        let mut items = Vec::new();
        let mut offset = 0;
        let mut pages = 0;

        loop {
            if pages >= self.pagination.max_pages {
                warn!(
                    "Stopped walking {} after {} pages ({} items)",
                    listing,
                    pages,
                    items.len()
                );
                break;
            }

            let page = fetch(offset).await?;
            pages += 1;
            let count = page.items.len();
            offset += count;
            items.extend(page.items);

            if count == 0 || !page.has_more || count < self.pagination.page_size {
                break;
            }
        }

        Ok(items)
    }
}
