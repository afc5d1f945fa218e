use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::pacer::{RequestPacer, Sleeper, TokioSleeper};
use super::retry_policy::RetryPolicy;
use super::{CatalogApi, CatalogError, Page};
use crate::catalog::{AlbumRecord, AlbumType, ArtistRef, TrackRecord};

/// Wraps a [`CatalogApi`] with request pacing and retries.
///
/// Every attempt, including retries, waits for its turn on the pacer, so the
/// configured delay holds for all callers sharing this instance.
pub struct ResilientCatalog<A> {
    inner: A,
    pacer: RequestPacer,
    retry_policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl<A: CatalogApi> ResilientCatalog<A> {
    pub fn new(inner: A, request_delay: Duration, retry_policy: RetryPolicy) -> Self {
        Self::with_sleeper(inner, request_delay, retry_policy, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(
        inner: A,
        request_delay: Duration,
        retry_policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            inner,
            pacer: RequestPacer::new(request_delay, sleeper.clone()),
            retry_policy,
            sleeper,
        }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    async fn call<'a, T, F, Fut>(&'a self, operation: &str, mut attempt: F) -> Result<T, CatalogError>
    where
        F: FnMut(&'a A) -> Fut,
        Fut: Future<Output = Result<T, CatalogError>> + 'a,
    {
        let mut retry_count = 0;
        loop {
            self.pacer.wait_turn().await;
            match attempt(&self.inner).await {
                Ok(value) => return Ok(value),
                Err(err) if self.retry_policy.should_retry(&err, retry_count) => {
                    let delay = self.retry_policy.delay_for(&err, retry_count);
                    warn!(
                        "{} failed (attempt {}/{}): {}, retrying in {:?}",
                        operation,
                        retry_count + 1,
                        self.retry_policy.max_retries + 1,
                        err,
                        delay
                    );
                    self.sleeper.sleep(delay).await;
                    retry_count += 1;
                }
                Err(err) => {
                    debug!("{} failed permanently: {}", operation, err);
                    return Err(err);
                }
            }
        }
    }
}

#[async_trait]
impl<A: CatalogApi> CatalogApi for ResilientCatalog<A> {
    async fn search_artist(&self, name: &str) -> Result<Option<ArtistRef>, CatalogError> {
        self.call("search_artist", |api| api.search_artist(name)).await
    }

    async fn search_tracks(
        &self,
        query: &str,
        market: Option<&str>,
        page_size: usize,
        offset: usize,
    ) -> Result<Page<TrackRecord>, CatalogError> {
        self.call("search_tracks", |api| {
            api.search_tracks(query, market, page_size, offset)
        })
        .await
    }

    async fn list_albums(
        &self,
        artist_id: &str,
        album_type: AlbumType,
        market: Option<&str>,
        page_size: usize,
        offset: usize,
    ) -> Result<Page<AlbumRecord>, CatalogError> {
        self.call("list_albums", |api| {
            api.list_albums(artist_id, album_type, market, page_size, offset)
        })
        .await
    }

    async fn list_tracks(
        &self,
        album_id: &str,
        page_size: usize,
        offset: usize,
    ) -> Result<Page<String>, CatalogError> {
        self.call("list_tracks", |api| api.list_tracks(album_id, page_size, offset))
            .await
    }

    async fn get_track_details(
        &self,
        ids: &[String],
        market: Option<&str>,
    ) -> Result<Vec<Option<TrackRecord>>, CatalogError> {
        self.call("get_track_details", |api| api.get_track_details(ids, market))
            .await
    }
}
