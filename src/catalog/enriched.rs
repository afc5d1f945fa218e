use chrono::NaiveDate;
use serde::Serialize;

use super::models::TrackRecord;
use super::release_date::ReleaseDate;
use super::round2;

/// A collected track plus the columns every report derives from it.
///
/// Derived fields are pure functions of the stored track and the collection's
/// reference date; an undefined input leaves the dependent column `None`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnrichedTrackRecord {
    /// Requested artist this row is compared under
    pub main_artist: String,
    pub track: TrackRecord,
    pub release_year: Option<i32>,
    pub release_month: Option<u32>,
    pub release_quarter: Option<u32>,
    pub duration_min: Option<f64>,
    pub age_years: Option<f64>,
    pub staying_index: Option<f64>,
    pub collaborator_count: usize,
    pub collab_flag: bool,
}

impl EnrichedTrackRecord {
    pub fn derive(main_artist: impl Into<String>, track: TrackRecord, reference_date: NaiveDate) -> Self {
        let release = track
            .release_date
            .as_deref()
            .and_then(|raw| ReleaseDate::parse(raw).ok());

        let age_years = release.and_then(|date| date.age_years(reference_date));
        let staying_index = staying_index(track.popularity.map(f64::from), age_years);
        let collaborator_count = collaborator_count(&track.artist_names);

        Self {
            main_artist: main_artist.into(),
            release_year: release.map(|date| date.year()),
            release_month: release.and_then(|date| date.month()),
            release_quarter: release.and_then(|date| date.quarter()),
            duration_min: track.duration_ms.map(|ms| ms as f64 / 60_000.0),
            age_years,
            staying_index,
            collaborator_count,
            collab_flag: collaborator_count > 1,
            track,
        }
    }

    pub fn track_id(&self) -> &str {
        &self.track.track_id
    }

    pub fn popularity(&self) -> Option<f64> {
        self.track.popularity.map(f64::from)
    }
}

/// popularity / (1 + age_years), two decimals.
///
/// Undefined when either input is missing, or when the release lies a year
/// or more past the reference date.
pub fn staying_index(popularity: Option<f64>, age_years: Option<f64>) -> Option<f64> {
    let popularity = popularity.filter(|p| p.is_finite())?;
    let age_years = age_years.filter(|a| a.is_finite())?;
    let denominator = 1.0 + age_years;
    if denominator <= 0.0 {
        return None;
    }
    Some(round2(popularity / denominator))
}

/// Number of credited artists with a non-blank name.
pub fn collaborator_count(artist_names: &[String]) -> usize {
    artist_names
        .iter()
        .filter(|name| !name.trim().is_empty())
        .count()
}
