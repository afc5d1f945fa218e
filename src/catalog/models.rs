//! Catalog models shared by the client adapter and the collection pipeline.

use serde::{Deserialize, Serialize};

use super::release_date::ReleaseDate;

// =============================================================================
// Enumerations
// =============================================================================

/// Relation of an album to the artist it was listed for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlbumType {
    Single,
    Album,
    Compilation,
    AppearsOn,
}

impl AlbumType {
    /// Every album type, in the order listings are walked by default.
    pub const ALL: [AlbumType; 4] = [
        AlbumType::Single,
        AlbumType::Album,
        AlbumType::Compilation,
        AlbumType::AppearsOn,
    ];

    /// Strict parse of the remote API / config string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Some(AlbumType::Single),
            "album" => Some(AlbumType::Album),
            "compilation" => Some(AlbumType::Compilation),
            "appears_on" => Some(AlbumType::AppearsOn),
            _ => None,
        }
    }

    /// Lenient conversion used for API responses.
    pub fn from_api_str(s: &str) -> Self {
        Self::parse(s).unwrap_or(AlbumType::Album) // Default fallback
    }

    /// Convert to the remote API string representation
    pub fn as_api_str(&self) -> &'static str {
        match self {
            AlbumType::Single => "single",
            AlbumType::Album => "album",
            AlbumType::Compilation => "compilation",
            AlbumType::AppearsOn => "appears_on",
        }
    }
}

impl std::fmt::Display for AlbumType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_api_str())
    }
}

// =============================================================================
// Core Entities
// =============================================================================

/// An artist name resolved to its catalog identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtistRef {
    pub name: String,
    pub canonical_id: String,
}

/// Album entry as produced by an artist's album listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRecord {
    pub album_id: String,
    pub name: String,
    pub album_type: AlbumType,
    /// Raw release date, possibly year or month precision only
    pub release_date: Option<String>,
    /// Artist whose listing surfaced this album
    pub artist_id: String,
}

impl AlbumRecord {
    /// Normalized release date, `None` when missing or malformed.
    pub fn parsed_release_date(&self) -> Option<ReleaseDate> {
        self.release_date
            .as_deref()
            .and_then(|raw| ReleaseDate::parse(raw).ok())
    }
}

/// Inclusive release-year window. Either bound may be open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

impl YearRange {
    pub fn new(start: Option<i32>, end: Option<i32>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start.map_or(true, |start| year >= start) && self.end.map_or(true, |end| year <= end)
    }

    /// Applies the window to a raw release date. Missing or malformed dates never match.
    pub fn matches(&self, release_date: Option<&str>) -> bool {
        release_date
            .and_then(|raw| ReleaseDate::parse(raw).ok())
            .map_or(false, |date| self.contains(date.year()))
    }
}

/// Fields that are only kept when a query asks for them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedTrackFields {
    pub isrc: Option<String>,
    pub disc_number: Option<u32>,
    pub track_number: Option<u32>,
    pub album_total_tracks: Option<u32>,
}

impl ExtendedTrackFields {
    fn fill_missing_from(&mut self, other: &ExtendedTrackFields) {
        fill(&mut self.isrc, &other.isrc);
        fill(&mut self.disc_number, &other.disc_number);
        fill(&mut self.track_number, &other.track_number);
        fill(&mut self.album_total_tracks, &other.album_total_tracks);
    }
}

/// Full track record. `track_id` is the dedup key across the whole pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub track_id: String,
    pub name: String,
    /// Credited artists, primary first
    pub artist_names: Vec<String>,
    pub album_id: Option<String>,
    pub album_name: Option<String>,
    pub album_type: Option<AlbumType>,
    pub release_date: Option<String>,
    pub duration_ms: Option<u64>,
    /// 0-100
    pub popularity: Option<u8>,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub extended: ExtendedTrackFields,
}

impl TrackRecord {
    /// Populates absent fields from a duplicate of the same track.
    /// Fields already set are never overwritten.
    pub fn fill_missing_from(&mut self, other: &TrackRecord) {
        if self.artist_names.is_empty() {
            self.artist_names = other.artist_names.clone();
        }
        fill(&mut self.album_id, &other.album_id);
        fill(&mut self.album_name, &other.album_name);
        fill(&mut self.album_type, &other.album_type);
        fill(&mut self.release_date, &other.release_date);
        fill(&mut self.duration_ms, &other.duration_ms);
        fill(&mut self.popularity, &other.popularity);
        self.extended.fill_missing_from(&other.extended);
    }

    pub fn without_extended_fields(mut self) -> Self {
        self.extended = ExtendedTrackFields::default();
        self
    }

    pub fn primary_artist(&self) -> Option<&str> {
        self.artist_names.first().map(String::as_str)
    }
}

fn fill<T: Clone>(slot: &mut Option<T>, other: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(other);
    }
}
