use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use super::CollectError;
use crate::catalog::ArtistRef;
use crate::catalog_api::{CatalogApi, CatalogError};

/// Resolves artist names to catalog ids, one lookup per distinct name.
///
/// Hits and misses are remembered for the lifetime of the resolver. Catalog
/// failures other than "not found" are not remembered, so a later resolve of
/// the same name tries again.
pub struct ArtistResolver {
    catalog: Arc<dyn CatalogApi>,
    resolved: Mutex<HashMap<String, Result<ArtistRef, CollectError>>>,
}

impl ArtistResolver {
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        Self {
            catalog,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// The lookup is keyed by the literal input; no case folding or trimming.
    pub async fn resolve(&self, name: &str) -> Result<ArtistRef, CollectError> {
        if let Some(known) = self.resolved.lock().await.get(name) {
            return known.clone();
        }

        let outcome = match self.catalog.search_artist(name).await {
            Ok(Some(artist)) => Ok(artist),
            Ok(None) | Err(CatalogError::NotFound(_)) => {
                Err(CollectError::ArtistNotFound(name.to_string()))
            }
            Err(err) => return Err(err.into()),
        };

        match &outcome {
            Ok(artist) => debug!("Resolved artist {:?} to {}", name, artist.canonical_id),
            Err(_) => debug!("No catalog artist matches {:?}", name),
        }
        self.resolved
            .lock()
            .await
            .insert(name.to_string(), outcome.clone());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_api::mock::MockCatalog;

    #[tokio::test]
    async fn test_resolve_hit_is_cached() {
        let mock = Arc::new(MockCatalog::new());
        mock.add_artist("IU", "iu-id");
        let resolver = ArtistResolver::new(mock.clone());

        let first = resolver.resolve("IU").await.unwrap();
        let second = resolver.resolve("IU").await.unwrap();

        assert_eq!(first.canonical_id, "iu-id");
        assert_eq!(first, second);
        assert_eq!(mock.call_count("search_artist"), 1);
    }

    #[tokio::test]
    async fn test_resolve_miss_is_cached() {
        let mock = Arc::new(MockCatalog::new());
        let resolver = ArtistResolver::new(mock.clone());

        let first = resolver.resolve("Nobody").await;
        let second = resolver.resolve("Nobody").await;

        assert_eq!(first, Err(CollectError::ArtistNotFound("Nobody".to_string())));
        assert_eq!(first, second);
        assert_eq!(mock.call_count("search_artist"), 1);
    }

    #[tokio::test]
    async fn test_resolve_not_found_error_maps_to_artist_not_found() {
        let mock = Arc::new(MockCatalog::new());
        mock.fail_next("search_artist", CatalogError::NotFound("404".to_string()));
        let resolver = ArtistResolver::new(mock.clone());

        let result = resolver.resolve("IU").await;

        assert_eq!(result, Err(CollectError::ArtistNotFound("IU".to_string())));
    }

    #[tokio::test]
    async fn test_resolve_transient_failure_is_not_cached() {
        let mock = Arc::new(MockCatalog::new());
        mock.add_artist("IU", "iu-id");
        mock.fail_next("search_artist", CatalogError::Transient("reset".to_string()));
        let resolver = ArtistResolver::new(mock.clone());

        let first = resolver.resolve("IU").await;
        let second = resolver.resolve("IU").await;

        assert!(matches!(first, Err(CollectError::Catalog(_))));
        assert_eq!(second.unwrap().canonical_id, "iu-id");
        assert_eq!(mock.call_count("search_artist"), 2);
    }

    #[tokio::test]
    async fn test_resolve_uses_literal_name() {
        let mock = Arc::new(MockCatalog::new());
        mock.add_artist("IU", "iu-id");
        let resolver = ArtistResolver::new(mock.clone());

        assert!(resolver.resolve("iu").await.is_err());
        assert!(resolver.resolve("IU").await.is_ok());
        assert_eq!(mock.call_count("search_artist"), 2);
    }
}
