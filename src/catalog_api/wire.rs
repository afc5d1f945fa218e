//! Response models of the remote catalog Web API.
//!
//! These types match the JSON returned by the catalog and include
//! conversion methods to the pipeline's records.

use serde::Deserialize;

use crate::catalog::{AlbumRecord, AlbumType, ArtistRef, ExtendedTrackFields, TrackRecord};

/// Offset-based page envelope.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiPaging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    /// URL of the next page, absent on the last one
    pub next: Option<String>,
}

impl<T> ApiPaging<T> {
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ArtistSearchResponse {
    pub artists: ApiPaging<ApiArtist>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TrackSearchResponse {
    pub tracks: ApiPaging<ApiTrack>,
}

/// `GET /tracks?ids=` answer. Unknown ids come back as `null`.
#[derive(Clone, Debug, Deserialize)]
pub struct TracksResponse {
    #[serde(default)]
    pub tracks: Vec<Option<ApiTrack>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiArtist {
    pub id: Option<String>,
    pub name: String,
}

impl ApiArtist {
    pub fn to_artist_ref(&self) -> Option<ArtistRef> {
        let id = self.id.as_ref().filter(|id| !id.is_empty())?;
        Some(ArtistRef {
            name: self.name.clone(),
            canonical_id: id.clone(),
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiAlbum {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub album_type: Option<String>,
    /// Relation to the listed artist, only present on artist album listings
    pub album_group: Option<String>,
    pub release_date: Option<String>,
    pub total_tracks: Option<u32>,
}

impl ApiAlbum {
    fn resolved_type(&self) -> Option<AlbumType> {
        self.album_group
            .as_deref()
            .or(self.album_type.as_deref())
            .map(AlbumType::from_api_str)
    }

    /// Convert to an album record listed under `artist_id`.
    pub fn to_album_record(&self, artist_id: &str) -> Option<AlbumRecord> {
        let id = self.id.as_ref().filter(|id| !id.is_empty())?;
        Some(AlbumRecord {
            album_id: id.clone(),
            name: self.name.clone(),
            album_type: self.resolved_type().unwrap_or(AlbumType::Album),
            release_date: self.release_date.clone(),
            artist_id: artist_id.to_string(),
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiExternalIds {
    pub isrc: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiTrack {
    /// Local or unavailable tracks have no id
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ApiArtist>,
    pub album: Option<ApiAlbum>,
    pub duration_ms: Option<u64>,
    pub popularity: Option<u8>,
    pub explicit: Option<bool>,
    pub disc_number: Option<u32>,
    pub track_number: Option<u32>,
    pub external_ids: Option<ApiExternalIds>,
}

impl ApiTrack {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Convert to a track record; `None` for tracks without an id.
    pub fn to_track_record(&self) -> Option<TrackRecord> {
        let track_id = self.id()?.to_string();
        let album = self.album.as_ref();
        Some(TrackRecord {
            track_id,
            name: self.name.clone(),
            artist_names: self.artists.iter().map(|a| a.name.clone()).collect(),
            album_id: album.and_then(|a| a.id.clone()),
            album_name: album.map(|a| a.name.clone()),
            album_type: album.and_then(|a| a.album_type.as_deref().map(AlbumType::from_api_str)),
            release_date: album.and_then(|a| a.release_date.clone()),
            duration_ms: self.duration_ms,
            popularity: self.popularity.map(|p| p.min(100)),
            explicit: self.explicit.unwrap_or(false),
            extended: ExtendedTrackFields {
                isrc: self.external_ids.as_ref().and_then(|ids| ids.isrc.clone()),
                disc_number: self.disc_number,
                track_number: self.track_number,
                album_total_tracks: album.and_then(|a| a.total_tracks),
            },
        })
    }
}
