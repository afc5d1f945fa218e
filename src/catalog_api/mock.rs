//! In-memory catalog used by the pipeline tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{CatalogApi, CatalogError, Page, Sleeper};
use crate::catalog::{AlbumRecord, AlbumType, ArtistRef, ExtendedTrackFields, TrackRecord};

/// Sleeper that records the requested durations instead of waiting.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub fn track(id: &str, artist: &str, album_id: &str, release_date: &str, popularity: u8) -> TrackRecord {
    TrackRecord {
        track_id: id.to_string(),
        name: format!("Track {}", id),
        artist_names: vec![artist.to_string()],
        album_id: Some(album_id.to_string()),
        album_name: Some(format!("Album {}", album_id)),
        album_type: Some(AlbumType::Album),
        release_date: Some(release_date.to_string()),
        duration_ms: Some(180_000),
        popularity: Some(popularity),
        explicit: false,
        extended: ExtendedTrackFields {
            isrc: Some(format!("ISRC{}", id)),
            disc_number: Some(1),
            track_number: Some(1),
            album_total_tracks: Some(10),
        },
    }
}

pub fn album(id: &str, artist_id: &str, album_type: AlbumType, release_date: &str) -> AlbumRecord {
    AlbumRecord {
        album_id: id.to_string(),
        name: format!("Album {}", id),
        album_type,
        release_date: Some(release_date.to_string()),
        artist_id: artist_id.to_string(),
    }
}

/// Serves stored data with offset pagination and counts calls per method.
pub struct MockCatalog {
    artists: Mutex<HashMap<String, ArtistRef>>,
    albums: Mutex<HashMap<(String, AlbumType), Vec<AlbumRecord>>>,
    album_tracks: Mutex<HashMap<String, Vec<String>>>,
    tracks: Mutex<HashMap<String, TrackRecord>>,
    searches: Mutex<HashMap<String, Vec<TrackRecord>>>,
    scripted_failures: Mutex<HashMap<String, VecDeque<CatalogError>>>,
    album_failures: Mutex<HashMap<String, CatalogError>>,
    artist_failures: Mutex<HashMap<String, CatalogError>>,
    always_has_more: Mutex<bool>,
    call_counts: Mutex<HashMap<String, usize>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            artists: Mutex::new(HashMap::new()),
            albums: Mutex::new(HashMap::new()),
            album_tracks: Mutex::new(HashMap::new()),
            tracks: Mutex::new(HashMap::new()),
            searches: Mutex::new(HashMap::new()),
            scripted_failures: Mutex::new(HashMap::new()),
            album_failures: Mutex::new(HashMap::new()),
            artist_failures: Mutex::new(HashMap::new()),
            always_has_more: Mutex::new(false),
            call_counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_artist(&self, name: &str, id: &str) {
        self.artists.lock().unwrap().insert(
            name.to_string(),
            ArtistRef {
                name: name.to_string(),
                canonical_id: id.to_string(),
            },
        );
    }

    pub fn add_album(&self, album: AlbumRecord) {
        self.albums
            .lock()
            .unwrap()
            .entry((album.artist_id.clone(), album.album_type))
            .or_default()
            .push(album);
    }

    /// Stores the tracks and lists their ids under `album_id`.
    pub fn add_album_tracks(&self, album_id: &str, tracks: Vec<TrackRecord>) {
        let ids = tracks.iter().map(|t| t.track_id.clone());
        self.album_tracks
            .lock()
            .unwrap()
            .entry(album_id.to_string())
            .or_default()
            .extend(ids);
        for track in tracks {
            self.add_track(track);
        }
    }

    pub fn add_track(&self, track: TrackRecord) {
        self.tracks
            .lock()
            .unwrap()
            .insert(track.track_id.clone(), track);
    }

    pub fn add_search_results(&self, query: &str, results: Vec<TrackRecord>) {
        self.searches
            .lock()
            .unwrap()
            .insert(query.to_string(), results);
    }

    /// Queue an error for the next call of `method`.
    pub fn fail_next(&self, method: &str, err: CatalogError) {
        self.scripted_failures
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(err);
    }

    /// Every `list_tracks` call for this album fails.
    pub fn fail_album_always(&self, album_id: &str, err: CatalogError) {
        self.album_failures
            .lock()
            .unwrap()
            .insert(album_id.to_string(), err);
    }

    /// Every `list_albums` call for this artist id fails.
    pub fn fail_artist_always(&self, artist_id: &str, err: CatalogError) {
        self.artist_failures
            .lock()
            .unwrap()
            .insert(artist_id.to_string(), err);
    }

    /// Report `has_more` on every page, even past the end of the data.
    pub fn set_always_has_more(&self, value: bool) {
        *self.always_has_more.lock().unwrap() = value;
    }

    pub fn call_count(&self, method: &str) -> usize {
        *self.call_counts.lock().unwrap().get(method).unwrap_or(&0)
    }

    pub fn total_calls(&self) -> usize {
        self.call_counts.lock().unwrap().values().sum()
    }

    fn increment_call(&self, method: &str) -> Result<(), CatalogError> {
        let mut counts = self.call_counts.lock().unwrap();
        *counts.entry(method.to_string()).or_insert(0) += 1;
        drop(counts);

        match self
            .scripted_failures
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn page_of<T: Clone>(&self, items: &[T], page_size: usize, offset: usize) -> Page<T> {
        let start = offset.min(items.len());
        let end = (start + page_size).min(items.len());
        let has_more = *self.always_has_more.lock().unwrap() || end < items.len();
        Page::new(items[start..end].to_vec(), has_more)
    }
}

#[async_trait]
impl CatalogApi for MockCatalog {
    async fn search_artist(&self, name: &str) -> Result<Option<ArtistRef>, CatalogError> {
        self.increment_call("search_artist")?;
        Ok(self.artists.lock().unwrap().get(name).cloned())
    }

    async fn search_tracks(
        &self,
        query: &str,
        _market: Option<&str>,
        page_size: usize,
        offset: usize,
    ) -> Result<Page<TrackRecord>, CatalogError> {
        self.increment_call("search_tracks")?;
        let results = self
            .searches
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default();
        Ok(self.page_of(&results, page_size, offset))
    }

    async fn list_albums(
        &self,
        artist_id: &str,
        album_type: AlbumType,
        _market: Option<&str>,
        page_size: usize,
        offset: usize,
    ) -> Result<Page<AlbumRecord>, CatalogError> {
        self.increment_call("list_albums")?;
        if let Some(err) = self.artist_failures.lock().unwrap().get(artist_id) {
            return Err(err.clone());
        }
        let albums = self
            .albums
            .lock()
            .unwrap()
            .get(&(artist_id.to_string(), album_type))
            .cloned()
            .unwrap_or_default();
        Ok(self.page_of(&albums, page_size, offset))
    }

    async fn list_tracks(
        &self,
        album_id: &str,
        page_size: usize,
        offset: usize,
    ) -> Result<Page<String>, CatalogError> {
        self.increment_call("list_tracks")?;
        if let Some(err) = self.album_failures.lock().unwrap().get(album_id) {
            return Err(err.clone());
        }
        let ids = self
            .album_tracks
            .lock()
            .unwrap()
            .get(album_id)
            .cloned()
            .unwrap_or_default();
        Ok(self.page_of(&ids, page_size, offset))
    }

    async fn get_track_details(
        &self,
        ids: &[String],
        _market: Option<&str>,
    ) -> Result<Vec<Option<TrackRecord>>, CatalogError> {
        self.increment_call("get_track_details")?;
        let tracks = self.tracks.lock().unwrap();
        Ok(ids.iter().map(|id| tracks.get(id).cloned()).collect())
    }
}
