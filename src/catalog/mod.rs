//! Catalog records as collected from the remote catalog, plus the derived
//! columns computed on top of them.

mod enriched;
mod models;
mod release_date;

pub use enriched::{collaborator_count, staying_index, EnrichedTrackRecord};
pub use models::{
    AlbumRecord, AlbumType, ArtistRef, ExtendedTrackFields, TrackRecord, YearRange,
};
pub use release_date::{MalformedDate, ReleaseDate};

/// Rounds to two decimals, the precision every derived metric is reported with.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
