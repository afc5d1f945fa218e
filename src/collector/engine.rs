//! Aggregation engine.
//!
//! Runs one of the collection strategies per requested artist, merges the
//! per-artist rows into a single deduplicated result, derives the computed
//! columns against one reference date and memoizes complete results in the
//! [`QueryCache`].

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use clap::ValueEnum;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::cache::QueryCache;
use super::detail_fetcher::DetailFetcher;
use super::enumerator::Enumerator;
use super::report::{ArtistOutcome, ArtistReport, CollectionReport};
use super::resolver::ArtistResolver;
use super::CollectError;
use crate::catalog::{EnrichedTrackRecord, TrackRecord};
use crate::catalog_api::{CatalogApi, CatalogError};
use crate::config::CollectionSettings;

/// How tracks are gathered for each artist.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionStrategy {
    /// Page through the track search for each artist. Fast, may miss entries.
    DirectSearch,
    /// Resolve the artist, walk its albums and fetch every track's details.
    #[default]
    ArtistAlbumWalk,
}

/// One collection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    pub artists: Vec<String>,
    pub limit_per_artist: usize,
    pub market: Option<String>,
    pub include_extended_fields: bool,
    pub strategy: CollectionStrategy,
}

impl CollectionQuery {
    pub fn new<I, S>(artists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            artists: artists.into_iter().map(Into::into).collect(),
            limit_per_artist: 20,
            market: None,
            include_extended_fields: false,
            strategy: CollectionStrategy::default(),
        }
    }

    pub fn limit_per_artist(mut self, limit: usize) -> Self {
        self.limit_per_artist = limit;
        self
    }

    pub fn market(mut self, market: Option<String>) -> Self {
        self.market = market;
        self
    }

    pub fn include_extended_fields(mut self, include: bool) -> Self {
        self.include_extended_fields = include;
        self
    }

    pub fn strategy(mut self, strategy: CollectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Trimmed, non-empty artist names with duplicates removed, first
    /// occurrence kept.
    pub fn normalized_artists(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.artists
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .filter(|name| seen.insert(name.to_string()))
            .map(str::to_string)
            .collect()
    }

    pub fn key(&self) -> QueryKey {
        QueryKey::Artists {
            artists: self.normalized_artists(),
            limit_per_artist: self.limit_per_artist,
            market: self.market.clone(),
            include_extended_fields: self.include_extended_fields,
            strategy: self.strategy,
        }
    }
}

/// Identity of a cached collection.
///
/// Artist order is part of the key: it decides which artist a shared track
/// is attributed to and where the album walk stops.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Artists {
        artists: Vec<String>,
        limit_per_artist: usize,
        market: Option<String>,
        include_extended_fields: bool,
        strategy: CollectionStrategy,
    },
    Keyword {
        query: String,
        total: usize,
        market: Option<String>,
        include_extended_fields: bool,
    },
}

#[derive(Debug, Clone)]
pub struct CollectionResult {
    /// Date every age-based column was computed against
    pub reference_date: NaiveDate,
    /// Unique by track id
    pub tracks: Vec<EnrichedTrackRecord>,
    pub report: CollectionReport,
}

struct Harvest {
    artist_id: Option<String>,
    tracks: Vec<TrackRecord>,
    skipped_albums: usize,
    retryable_skips: usize,
}

enum ArtistRun {
    Collected(Harvest),
    Failed(CollectError),
    Skipped,
}

pub struct CollectionEngine {
    catalog: Arc<dyn CatalogApi>,
    settings: CollectionSettings,
    cache: Arc<QueryCache>,
}

impl CollectionEngine {
    pub fn new(catalog: Arc<dyn CatalogApi>, settings: CollectionSettings) -> Self {
        Self::with_cache(catalog, settings, Arc::new(QueryCache::new()))
    }

    pub fn with_cache(
        catalog: Arc<dyn CatalogApi>,
        settings: CollectionSettings,
        cache: Arc<QueryCache>,
    ) -> Self {
        Self {
            catalog,
            settings,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn settings(&self) -> &CollectionSettings {
        &self.settings
    }

    /// Collect tracks for every artist of `query`.
    ///
    /// Failures of single artists are recorded in the report and never abort
    /// the batch. An identical query answered before is served from the cache
    /// without touching the catalog.
    pub async fn collect(&self, query: &CollectionQuery) -> Arc<CollectionResult> {
        let key = query.key();
        if let Some(hit) = self.cache.get(&key).await {
            info!("Serving {} artists from the query cache", query.artists.len());
            return hit;
        }

        let artists = query.normalized_artists();
        let market = query.market.as_deref();
        info!(
            "Collecting {} artists ({:?}, limit {} per artist)",
            artists.len(),
            query.strategy,
            query.limit_per_artist
        );

        let runs = match query.strategy {
            CollectionStrategy::DirectSearch => {
                self.run_direct_search(&artists, query.limit_per_artist, market)
                    .await
            }
            CollectionStrategy::ArtistAlbumWalk => {
                self.run_album_walk(&artists, query.limit_per_artist, market)
                    .await
            }
        };

        let result = self.assemble(artists, runs, query.include_extended_fields);
        self.store(key, result).await
    }

    /// Collect up to `total` tracks matching a free search query, such as
    /// `genre:"k-pop"`. Rows are labelled with the query itself.
    pub async fn collect_keyword(
        &self,
        query: &str,
        total: usize,
        market: Option<&str>,
    ) -> Arc<CollectionResult> {
        let query = query.trim();
        let include_extended_fields = self.settings.include_extended_fields;
        let key = QueryKey::Keyword {
            query: query.to_string(),
            total,
            market: market.map(str::to_string),
            include_extended_fields,
        };
        if let Some(hit) = self.cache.get(&key).await {
            info!("Serving {:?} from the query cache", query);
            return hit;
        }

        let (labels, runs) = if query.is_empty() {
            (vec![], vec![])
        } else {
            info!("Collecting up to {} tracks for {:?}", total, query);
            let run = match self.search_pages(query, total, market).await {
                Ok(tracks) => ArtistRun::Collected(Harvest {
                    artist_id: None,
                    tracks,
                    skipped_albums: 0,
                    retryable_skips: 0,
                }),
                Err(err) => {
                    warn!("Keyword search {:?} failed: {}", query, err);
                    ArtistRun::Failed(err.into())
                }
            };
            (vec![query.to_string()], vec![run])
        };

        let result = self.assemble(labels, runs, include_extended_fields);
        self.store(key, result).await
    }

    fn concurrency(&self) -> usize {
        self.settings.max_concurrent_artists.max(1)
    }

    fn reference_date(&self) -> NaiveDate {
        self.settings
            .reference_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    async fn run_direct_search(
        &self,
        artists: &[String],
        limit: usize,
        market: Option<&str>,
    ) -> Vec<ArtistRun> {
        stream::iter(artists)
            .map(|artist| async move {
                let query = self
                    .settings
                    .search_query_template
                    .replace("{artist}", artist);
                match self.search_pages(&query, limit, market).await {
                    Ok(tracks) => {
                        debug!("Search for {:?} returned {} tracks", artist, tracks.len());
                        ArtistRun::Collected(Harvest {
                            artist_id: None,
                            tracks,
                            skipped_albums: 0,
                            retryable_skips: 0,
                        })
                    }
                    Err(err) => {
                        warn!("Track search for {:?} failed: {}", artist, err);
                        ArtistRun::Failed(err.into())
                    }
                }
            })
            .buffered(self.concurrency())
            .collect()
            .await
    }

    /// Pages through the track search until `limit` unique tracks are
    /// gathered or the listing runs out.
    async fn search_pages(
        &self,
        query: &str,
        limit: usize,
        market: Option<&str>,
    ) -> Result<Vec<TrackRecord>, CatalogError> {
        let pagination = self.settings.pagination;
        let mut seen = HashSet::new();
        let mut tracks = Vec::new();
        let mut offset = 0;
        let mut pages = 0;

        while tracks.len() < limit {
            if pages >= pagination.max_pages {
                warn!("Stopped searching {:?} after {} pages", query, pages);
                break;
            }

            let requested = pagination.page_size.min(limit - tracks.len());
            let page = self
                .catalog
                .search_tracks(query, market, requested, offset)
                .await?;
            pages += 1;
            let count = page.items.len();
            offset += count;
            tracks.extend(
                page.items
                    .into_iter()
                    .filter(|track| seen.insert(track.track_id.clone())),
            );

            if count == 0 || count < requested || !page.has_more {
                break;
            }
        }

        tracks.truncate(limit);
        Ok(tracks)
    }

    async fn run_album_walk(
        &self,
        artists: &[String],
        limit: usize,
        market: Option<&str>,
    ) -> Vec<ArtistRun> {
        let target = limit.saturating_mul(artists.len());
        let collected = AtomicUsize::new(0);
        let resolver = ArtistResolver::new(self.catalog.clone());
        let enumerator = Enumerator::new(self.catalog.clone(), self.settings.pagination);
        let fetcher = DetailFetcher::new(self.catalog.clone(), self.settings.detail_batch_size);

        let collected = &collected;
        let resolver = &resolver;
        let enumerator = &enumerator;
        let fetcher = &fetcher;

        stream::iter(artists)
            .map(move |artist| async move {
                // checked when the artist's pipeline starts, not when it is queued
                if collected.load(Ordering::SeqCst) >= target {
                    debug!("Target of {} tracks reached, skipping {:?}", target, artist);
                    return ArtistRun::Skipped;
                }
                match self
                    .walk_artist(artist, market, resolver, enumerator, fetcher)
                    .await
                {
                    Ok(harvest) => {
                        collected.fetch_add(harvest.tracks.len(), Ordering::SeqCst);
                        ArtistRun::Collected(harvest)
                    }
                    Err(err) => {
                        warn!("Collecting {:?} failed: {}", artist, err);
                        ArtistRun::Failed(err)
                    }
                }
            })
            .buffered(self.concurrency())
            .collect()
            .await
    }

    async fn walk_artist(
        &self,
        artist: &str,
        market: Option<&str>,
        resolver: &ArtistResolver,
        enumerator: &Enumerator,
        fetcher: &DetailFetcher,
    ) -> Result<Harvest, CollectError> {
        let artist_ref = resolver.resolve(artist).await?;
        let artist_id = artist_ref.canonical_id;

        let year_range = Some(self.settings.year_range)
            .filter(|range| range.start.is_some() || range.end.is_some());
        let mut albums = enumerator
            .enumerate_albums(&artist_id, &self.settings.album_types, market, year_range)
            .await?;
        albums.truncate(self.settings.max_albums_per_artist);

        let mut track_ids = Vec::new();
        let mut skipped_albums = 0;
        let mut retryable_skips = 0;
        for album in &albums {
            match enumerator.enumerate_tracks(&album.album_id).await {
                Ok(ids) => track_ids.extend(ids),
                Err(err) => {
                    warn!(
                        "Skipping album {} ({}) of {:?}: {}",
                        album.album_id, album.name, artist, err
                    );
                    skipped_albums += 1;
                    if err.is_retryable() {
                        retryable_skips += 1;
                    }
                }
            }
        }

        let tracks = fetcher.fetch_details(&track_ids, market).await?;
        debug!(
            "Collected {} tracks from {} albums of {:?}",
            tracks.len(),
            albums.len(),
            artist
        );
        Ok(Harvest {
            artist_id: Some(artist_id),
            tracks,
            skipped_albums,
            retryable_skips,
        })
    }

    /// Merges per-artist rows in request order. The first occurrence of a
    /// track wins; its absent fields are filled from later duplicates.
    fn assemble(
        &self,
        artists: Vec<String>,
        runs: Vec<ArtistRun>,
        include_extended_fields: bool,
    ) -> CollectionResult {
        let reference_date = self.reference_date();
        let mut merged: Vec<(String, TrackRecord)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut report = CollectionReport::default();

        for (artist, run) in artists.into_iter().zip(runs) {
            let outcome = match run {
                ArtistRun::Collected(harvest) => {
                    let gathered = harvest.tracks.len();
                    for track in harvest.tracks {
                        let track = if include_extended_fields {
                            track
                        } else {
                            track.without_extended_fields()
                        };
                        match positions.get(&track.track_id) {
                            Some(&position) => merged[position].1.fill_missing_from(&track),
                            None => {
                                positions.insert(track.track_id.clone(), merged.len());
                                merged.push((artist.clone(), track));
                            }
                        }
                    }
                    ArtistOutcome::Collected {
                        artist_id: harvest.artist_id,
                        tracks: gathered,
                        skipped_albums: harvest.skipped_albums,
                        retryable_skips: harvest.retryable_skips,
                    }
                }
                ArtistRun::Failed(err) => ArtistOutcome::Failed(err),
                ArtistRun::Skipped => ArtistOutcome::Skipped,
            };
            report.artists.push(ArtistReport { artist, outcome });
        }

        let tracks = merged
            .into_iter()
            .map(|(artist, track)| EnrichedTrackRecord::derive(artist, track, reference_date))
            .collect();

        CollectionResult {
            reference_date,
            tracks,
            report,
        }
    }

    async fn store(&self, key: QueryKey, result: CollectionResult) -> Arc<CollectionResult> {
        let result = Arc::new(result);
        if result.report.has_retryable_failure() {
            warn!("Result is missing data that exhausted its retries, not caching it");
            return result;
        }
        self.cache.insert(key, result).await
    }
}
