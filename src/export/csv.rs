use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::catalog::{round2, EnrichedTrackRecord};
use crate::metrics::CohortBucket;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// One exported line. Undefined values serialize as empty cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvRow<'a> {
    pub track_id: &'a str,
    pub track_name: &'a str,
    pub main_artist: &'a str,
    pub artists: String,
    pub album_id: Option<&'a str>,
    pub album_name: Option<&'a str>,
    pub album_type: Option<&'static str>,
    pub release_date: Option<&'a str>,
    pub release_year: Option<i32>,
    pub release_month: Option<u32>,
    pub release_quarter: Option<u32>,
    pub duration_ms: Option<u64>,
    pub duration_min: Option<f64>,
    pub popularity: Option<u8>,
    pub explicit: bool,
    pub age_years: Option<f64>,
    pub staying_index: Option<f64>,
    pub cohort: Option<&'static str>,
    pub collaborator_count: usize,
    pub collab_flag: bool,
    pub isrc: Option<&'a str>,
    pub disc_number: Option<u32>,
    pub track_number: Option<u32>,
    pub album_total_tracks: Option<u32>,
}

impl CsvRow<'_> {
    /// Column names, in field order
    pub const HEADERS: [&'static str; 24] = [
        "track_id",
        "track_name",
        "main_artist",
        "artists",
        "album_id",
        "album_name",
        "album_type",
        "release_date",
        "release_year",
        "release_month",
        "release_quarter",
        "duration_ms",
        "duration_min",
        "popularity",
        "explicit",
        "age_years",
        "staying_index",
        "cohort",
        "collaborator_count",
        "collab_flag",
        "isrc",
        "disc_number",
        "track_number",
        "album_total_tracks",
    ];
}

impl<'a> From<&'a EnrichedTrackRecord> for CsvRow<'a> {
    fn from(record: &'a EnrichedTrackRecord) -> Self {
        let track = &record.track;
        CsvRow {
            track_id: &track.track_id,
            track_name: &track.name,
            main_artist: &record.main_artist,
            artists: track.artist_names.join(", "),
            album_id: track.album_id.as_deref(),
            album_name: track.album_name.as_deref(),
            album_type: track.album_type.map(|t| t.as_api_str()),
            release_date: track.release_date.as_deref(),
            release_year: record.release_year,
            release_month: record.release_month,
            release_quarter: record.release_quarter,
            duration_ms: track.duration_ms,
            duration_min: record.duration_min.map(round2),
            popularity: track.popularity,
            explicit: track.explicit,
            age_years: record.age_years.map(round2),
            staying_index: record.staying_index,
            cohort: CohortBucket::from_age(record.age_years).map(|b| b.label()),
            collaborator_count: record.collaborator_count,
            collab_flag: record.collab_flag,
            isrc: track.extended.isrc.as_deref(),
            disc_number: track.extended.disc_number,
            track_number: track.extended.track_number,
            album_total_tracks: track.extended.album_total_tracks,
        }
    }
}

/// Writes a header row plus one row per track and returns the number of
/// data rows written. The header is written even when `tracks` is empty.
pub fn write_csv<W: Write>(
    mut writer: W,
    tracks: &[EnrichedTrackRecord],
    with_bom: bool,
) -> Result<usize> {
    if with_bom {
        writer
            .write_all(UTF8_BOM)
            .context("Failed to write byte order mark")?;
    }

    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer
        .write_record(CsvRow::HEADERS)
        .context("Failed to write CSV header")?;
    for record in tracks {
        csv_writer
            .serialize(CsvRow::from(record))
            .with_context(|| format!("Failed to write row for track {}", record.track_id()))?;
    }
    csv_writer.flush().context("Failed to flush CSV output")?;

    Ok(tracks.len())
}

/// Writes `tracks` to `path`, creating parent directories as needed.
pub fn export_csv(path: &Path, tracks: &[EnrichedTrackRecord], with_bom: bool) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let rows = write_csv(BufWriter::new(file), tracks, with_bom)
        .with_context(|| format!("Failed to export tracks to {:?}", path))?;

    info!("Exported {} tracks to {:?}", rows, path);
    Ok(rows)
}
