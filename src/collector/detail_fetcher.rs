use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::TrackRecord;
use crate::catalog_api::{CatalogApi, CatalogError};

/// Fetches full track records in batches of at most `batch_size` ids.
pub struct DetailFetcher {
    catalog: Arc<dyn CatalogApi>,
    batch_size: usize,
}

impl DetailFetcher {
    pub fn new(catalog: Arc<dyn CatalogApi>, batch_size: usize) -> Self {
        Self {
            catalog,
            batch_size: batch_size.max(1),
        }
    }

    /// Duplicate ids are requested once, in first-seen order. Ids the catalog
    /// no longer knows are dropped; a failing batch fails the whole fetch.
    pub async fn fetch_details(
        &self,
        track_ids: &[String],
        market: Option<&str>,
    ) -> Result<Vec<TrackRecord>, CatalogError> {
        let mut seen = HashSet::with_capacity(track_ids.len());
        let unique: Vec<String> = track_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        let mut records = Vec::with_capacity(unique.len());
        for chunk in unique.chunks(self.batch_size) {
            let details = self.catalog.get_track_details(chunk, market).await?;
            records.extend(details.into_iter().flatten());
        }

        if records.len() < unique.len() {
            debug!(
                "{} of {} requested tracks are unavailable",
                unique.len() - records.len(),
                unique.len()
            );
        }
        Ok(records)
    }
}
