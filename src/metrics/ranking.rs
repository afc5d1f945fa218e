use std::cmp::Ordering;

use clap::ValueEnum;

use super::Metric;
use crate::catalog::EnrichedTrackRecord;

/// Ordering applied to the exported rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    /// Highest staying index first
    StayingIndex,
    /// Most popular first
    Popularity,
    /// Newest release first
    AgeYears,
    /// Oldest release first
    ReleaseYear,
    /// Shortest track first
    DurationMin,
}

impl SortKey {
    fn metric(&self) -> Metric {
        match self {
            SortKey::StayingIndex => Metric::StayingIndex,
            SortKey::Popularity => Metric::Popularity,
            SortKey::AgeYears => Metric::AgeYears,
            SortKey::ReleaseYear => Metric::ReleaseYear,
            SortKey::DurationMin => Metric::DurationMin,
        }
    }

    fn descending(&self) -> bool {
        matches!(self, SortKey::StayingIndex | SortKey::Popularity)
    }
}

/// Keeps records whose popularity reaches `floor`; missing popularity counts
/// as zero. A zero floor keeps everything.
pub fn apply_min_popularity(records: Vec<EnrichedTrackRecord>, floor: u8) -> Vec<EnrichedTrackRecord> {
    if floor == 0 {
        return records;
    }
    records
        .into_iter()
        .filter(|r| r.track.popularity.unwrap_or(0) >= floor)
        .collect()
}

/// Sorts by `key`, then by popularity descending. Undefined values sort last
/// in either direction.
pub fn sort_records(records: &mut [EnrichedTrackRecord], key: SortKey) {
    let metric = key.metric();
    records.sort_by(|a, b| {
        let primary = compare_defined_first(metric.value_of(a), metric.value_of(b), key.descending());
        primary.then_with(|| {
            compare_defined_first(
                Metric::Popularity.value_of(a),
                Metric::Popularity.value_of(b),
                true,
            )
        })
    });
}

fn compare_defined_first(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.total_cmp(&a),
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::test_support::record;

    fn ids(records: &[EnrichedTrackRecord]) -> Vec<&str> {
        records.iter().map(|r| r.track_id()).collect()
    }

    #[test]
    fn test_min_popularity_floor() {
        let records = vec![
            record("a", "IU", Some("2021"), Some(30)),
            record("b", "IU", Some("2021"), Some(70)),
            record("c", "IU", Some("2021"), None),
        ];

        assert_eq!(apply_min_popularity(records.clone(), 0).len(), 3);
        let kept = apply_min_popularity(records, 50);
        assert_eq!(ids(&kept), vec!["b"]);
    }

    #[test]
    fn test_sort_by_staying_index_descending_undefined_last() {
        let mut records = vec![
            record("old", "IU", Some("2014-01-01"), Some(60)),
            record("none", "IU", None, Some(99)),
            record("new", "IU", Some("2023-01-01"), Some(60)),
        ];

        sort_records(&mut records, SortKey::StayingIndex);

        assert_eq!(ids(&records), vec!["new", "old", "none"]);
    }

    #[test]
    fn test_sort_by_age_ascending_ties_by_popularity() {
        let mut records = vec![
            record("a", "IU", Some("2020-01-01"), Some(40)),
            record("b", "IU", Some("2023-01-01"), Some(10)),
            record("c", "IU", Some("2020-01-01"), Some(90)),
        ];

        sort_records(&mut records, SortKey::AgeYears);

        assert_eq!(ids(&records), vec!["b", "c", "a"]);
    }
}
